//! Quake detail screen UI
//!
//! Renders the detailed view for a single earthquake: magnitude and severity,
//! place, time in both local and UTC, coordinates and the event page link.

use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::data::Quake;

use super::quake_list::severity_color;

mod colors {
    use ratatui::style::Color;

    /// Field labels
    pub const LABEL: Color = Color::Gray;
    /// Primary text
    pub const PRIMARY: Color = Color::White;
    /// Missing values
    pub const UNKNOWN: Color = Color::DarkGray;
    /// Borders and titles
    pub const HEADER: Color = Color::Cyan;
}

/// Renders the detail screen for the quake at `index`
///
/// Falls back to a short notice if the index no longer points at a quake,
/// which can happen for one frame after a refresh shrinks the list.
pub fn render(frame: &mut Frame, app: &App, index: usize) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let position = format!(" {} of {} ", index + 1, app.quake_count());
    let block = Block::default()
        .title(" Earthquake ")
        .title_bottom(Line::from(position).right_aligned())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::HEADER));

    let lines = match app.quakes.get(index) {
        Some(quake) => detail_lines(quake),
        None => vec![Line::from(Span::styled(
            "This quake is no longer in the list.",
            Style::default().fg(colors::UNKNOWN),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, chunks[0]);

    let help = Line::from(vec![
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Prev/next  "),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" Back  "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" Refresh  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit"),
    ]);
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[1],
    );
}

fn detail_lines(quake: &Quake) -> Vec<Line<'static>> {
    let severity = quake.severity();
    let local_time = quake.occurred_at.with_timezone(&Local);

    vec![
        Line::from(vec![
            Span::styled(
                format!("M {:.1}", quake.magnitude),
                Style::default()
                    .fg(severity_color(severity))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                severity.label(),
                Style::default().fg(severity_color(severity)),
            ),
        ]),
        Line::from(""),
        field("Place", quake.title().to_string()),
        field("Time", local_time.format("%a %b %d %Y, %H:%M:%S").to_string()),
        field(
            "UTC",
            quake.occurred_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        field(
            "Location",
            format_coordinates(quake.location.latitude, quake.location.longitude),
        ),
        match quake.detail_url {
            Some(ref url) => field("Details", url.clone()),
            None => Line::from(vec![
                label("Details"),
                Span::styled("not available", Style::default().fg(colors::UNKNOWN)),
            ]),
        },
    ]
}

fn label(name: &str) -> Span<'static> {
    Span::styled(format!("{:<10}", name), Style::default().fg(colors::LABEL))
}

fn field(name: &str, value: String) -> Line<'static> {
    Line::from(vec![
        label(name),
        Span::styled(value, Style::default().fg(colors::PRIMARY)),
    ])
}

/// Formats coordinates as e.g. "35.71°N, 117.50°W"
fn format_coordinates(latitude: f64, longitude: f64) -> String {
    let ns = if latitude < 0.0 { 'S' } else { 'N' };
    let ew = if longitude < 0.0 { 'W' } else { 'E' };
    format!(
        "{:.2}\u{00B0}{}, {:.2}\u{00B0}{}",
        latitude.abs(),
        ns,
        longitude.abs(),
        ew
    )
}
