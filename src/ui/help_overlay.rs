//! Key binding overlay drawn over the list or detail view

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const OVERLAY_WIDTH: u16 = 50;

/// Sections of (keys, action) pairs, in display order
const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation",
        &[
            ("↑/k, ↓/j", "Move selection up/down"),
            ("g, G", "Jump to first/last quake"),
            ("Enter", "Open quake details"),
            ("Esc", "Go back / Close"),
            ("q", "Quit application"),
        ],
    ),
    (
        "Data",
        &[
            ("r", "Refresh now (cached list first)"),
            ("?", "Toggle this help"),
        ],
    ),
];

/// Draws the overlay centred on the frame
pub fn render(frame: &mut Frame) {
    let mut lines = vec![Line::from(Span::styled(
        "Keyboard Shortcuts",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))];

    for (title, bindings) in SECTIONS {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            *title,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.extend(bindings.iter().map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("  {:<12}", keys), Style::default().fg(Color::Yellow)),
                Span::raw(*action),
            ])
        }));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Esc or ? to close",
        Style::default().fg(Color::DarkGray),
    )));

    // Content plus top and bottom border
    let height = lines.len() as u16 + 2;
    let area = centered(frame.area(), OVERLAY_WIDTH, height);

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        ),
        area,
    );
}

/// A `width` x `height` rect centred in `outer`, shrunk to fit
fn centered(outer: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(outer.width);
    let height = height.min(outer.height);
    Rect {
        x: outer.x + (outer.width - width) / 2,
        y: outer.y + (outer.height - height) / 2,
        width,
        height,
    }
}
