//! quakewatch - recent earthquakes in the terminal
//!
//! A terminal UI application that lists earthquakes from the USGS event feed,
//! showing today's cached result instantly while a fresh copy loads.

use std::io;
use std::panic;
use std::process;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use quakewatch::app::{App, AppState};
use quakewatch::cli::{Cli, StartupConfig};
use quakewatch::fetcher::QuakeFetcher;
use quakewatch::refresh::{try_recv, RefreshHandle};
use quakewatch::ui;

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// This ensures the terminal is usable even if the application panics.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore the terminal
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        // Call the original panic hook
        original_hook(panic_info);
    }));
}

/// Renders the UI based on the current application state
fn render_ui(frame: &mut ratatui::Frame, app: &App) {
    match app.state {
        AppState::Loading => {
            render_loading(frame);
        }
        AppState::QuakeList => {
            ui::render_quake_list(frame, app);
        }
        AppState::QuakeDetail(index) => {
            ui::render_quake_detail(frame, app, index);
        }
    }

    if app.show_help {
        ui::render_help_overlay(frame);
    }
}

/// Renders a loading message while the first fetch is running
fn render_loading(frame: &mut ratatui::Frame) {
    use ratatui::{
        layout::{Alignment, Constraint, Direction, Layout},
        style::{Color, Style},
        widgets::Paragraph,
    };

    let area = frame.area();

    // Center the loading message vertically
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(area);

    let loading_text = Paragraph::new("Loading earthquakes...")
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);

    frame.render_widget(loading_text, chunks[1]);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Validate before touching the terminal so errors print normally
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    // Logs go to a file only; stdout belongs to the TUI
    if let Some(ref log_file) = config.log_file {
        let file = std::fs::File::create(log_file)?;
        tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    info!(
        feed_url = %config.fetch.feed_url,
        days_back = config.fetch.days_back,
        max_concurrent = config.fetch.max_concurrent,
        "starting quakewatch"
    );

    let fetcher = QuakeFetcher::new(&config.fetch);

    // Set up panic hook to restore terminal on crash
    setup_panic_hook();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::with_days_back(config.fetch.days_back);
    let mut refresh = RefreshHandle::spawn(fetcher, config.refresh.clone());

    // Main event loop
    loop {
        // Apply everything the refresh task has delivered since the last frame
        while let Some(message) = try_recv(&mut refresh) {
            app.apply_refresh_message(message);
        }

        terminal.draw(|f| render_ui(f, &app))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.take_refresh_request() {
            refresh.request_refresh();
        }

        // Check if we should quit
        if app.should_quit {
            break;
        }
    }

    refresh.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    info!("quakewatch exited");
    Ok(())
}
