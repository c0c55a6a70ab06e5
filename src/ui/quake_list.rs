//! Quake list screen rendering
//!
//! Renders the main list of recent earthquakes with magnitude, place and
//! local time, plus a status line showing where the data came from.

use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::Severity;
use crate::refresh::DataSource;

/// Color for a severity class (stronger = hotter)
pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Minor => Color::Gray,
        Severity::Light => Color::Green,
        Severity::Moderate => Color::Yellow,
        Severity::Strong => Color::LightRed,
        Severity::Major => Color::Red,
        Severity::Great => Color::Magenta,
    }
}

/// Index of the first row to draw so the selection stays visible
fn scroll_offset(selected: usize, visible_rows: usize) -> usize {
    if visible_rows == 0 {
        return 0;
    }
    selected.saturating_sub(visible_rows - 1)
}

/// Renders the quake list screen
///
/// Layout is a one-line header, the bordered list and a status line. The
/// selected quake is marked with a cursor and highlighted.
pub fn render_quake_list(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(3),    // Quake list
            Constraint::Length(1), // Status line
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    render_list(frame, app, chunks[1]);
    render_status(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let time_str = Local::now().format("%a %b %d, %H:%M").to_string();

    let mut spans = vec![
        Span::styled(
            "QUAKEWATCH",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(time_str, Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled(
            format!("last {} days", app.days_back),
            Style::default().fg(Color::Gray),
        ),
    ];

    if app.refreshing {
        spans.push(Span::styled(
            "  refreshing...",
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" Earthquakes ({}) ", app.quake_count()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.quakes.is_empty() {
        let message = if app.last_error.is_some() {
            "No quakes loaded. Press r to retry."
        } else {
            "No quakes in this period."
        };
        let paragraph = Paragraph::new(Span::styled(
            message,
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_rows = area.height.saturating_sub(2) as usize;
    let offset = scroll_offset(app.selected_index, visible_rows);

    let lines: Vec<Line> = app
        .quakes
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows)
        .map(|(index, quake)| {
            let is_selected = index == app.selected_index;
            let cursor = if is_selected { "\u{25B8} " } else { "  " }; // ▸ or space

            let name_style = if is_selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            // Format: "▸ M 4.5  12 km SW of Somewhere          2024-03-15 12:30"
            Line::from(vec![
                Span::styled(cursor, Style::default().fg(Color::Cyan)),
                Span::styled(
                    format!("M{:>4.1}", quake.magnitude),
                    Style::default()
                        .fg(severity_color(quake.severity()))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(format!("{:<40}", quake.title()), name_style),
                Span::raw(" "),
                Span::styled(quake.subtitle(), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Renders key hints and data freshness
fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Navigate  "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Details  "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" Refresh  "),
        Span::styled("?", Style::default().fg(Color::Yellow)),
        Span::raw(" Help  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit"),
    ];

    let source = match app.data_source {
        Some(DataSource::Cache) => Some("cache"),
        Some(DataSource::Network) => Some("network"),
        None => None,
    };
    if let Some(source) = source {
        spans.push(Span::styled(
            format!(" │ Source: {}", source),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if let Some(last_refresh) = app.last_refresh {
        let elapsed = Local::now() - last_refresh;
        let mins_ago = elapsed.num_minutes();
        let freshness_text = if mins_ago < 1 {
            " │ Updated: just now".to_string()
        } else if mins_ago < 60 {
            format!(" │ Updated: {}m ago", mins_ago)
        } else {
            format!(" │ Updated: {}h ago", elapsed.num_hours())
        };
        spans.push(Span::styled(
            freshness_text,
            Style::default().fg(Color::DarkGray),
        ));
    }

    if let Some(ref error) = app.last_error {
        spans.push(Span::styled(
            format!(" │ Error: {}", error),
            Style::default().fg(Color::Red),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
