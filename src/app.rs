//! Application state management for quakewatch
//!
//! This module contains the main application state, handling keyboard input,
//! refresh messages, and state transitions between the list and detail views.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};

use crate::data::{Quake, DEFAULT_DAYS_BACK};
use crate::refresh::{DataSource, RefreshMessage};

/// Application state enum representing the current view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Waiting for the first delivery
    Loading,
    /// List of all quakes
    QuakeList,
    /// Detail view for the quake at this index
    QuakeDetail(usize),
}

/// Main application struct managing state and data
pub struct App {
    /// Current application state/view
    pub state: AppState,
    /// Quakes currently shown, in feed order
    pub quakes: Vec<Quake>,
    /// Index of currently selected quake in list view
    pub selected_index: usize,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Flag indicating a refresh has been requested
    pub refresh_requested: bool,
    /// Whether a refresh cycle is running
    pub refreshing: bool,
    /// Source of the quakes currently shown
    pub data_source: Option<DataSource>,
    /// Timestamp of last successful network refresh
    pub last_refresh: Option<DateTime<Local>>,
    /// Most recent fetch error, cleared by the next network success
    pub last_error: Option<String>,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Lookback shown in the header
    pub days_back: u32,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Creates a new App instance with default state
    pub fn new() -> Self {
        Self::with_days_back(DEFAULT_DAYS_BACK)
    }

    /// Creates a new App instance for the given lookback
    pub fn with_days_back(days_back: u32) -> Self {
        Self {
            state: AppState::Loading,
            quakes: Vec::new(),
            selected_index: 0,
            should_quit: false,
            refresh_requested: false,
            refreshing: false,
            data_source: None,
            last_refresh: None,
            last_error: None,
            show_help: false,
            days_back,
        }
    }

    /// Returns the total number of quakes
    pub fn quake_count(&self) -> usize {
        self.quakes.len()
    }

    /// Returns the currently selected quake, if any
    pub fn selected_quake(&self) -> Option<&Quake> {
        self.quakes.get(self.selected_index)
    }

    /// Returns the quake shown in the detail view, if any
    pub fn detail_quake(&self) -> Option<&Quake> {
        match self.state {
            AppState::QuakeDetail(index) => self.quakes.get(index),
            _ => None,
        }
    }

    /// Applies a message from the background refresh task
    pub fn apply_refresh_message(&mut self, message: RefreshMessage) {
        match message {
            RefreshMessage::RefreshStarted => {
                self.refreshing = true;
            }
            RefreshMessage::QuakesLoaded { quakes, source } => {
                self.set_quakes(quakes);
                self.data_source = Some(source);
                if source == DataSource::Network {
                    self.last_refresh = Some(Local::now());
                    self.last_error = None;
                }
                self.leave_loading();
            }
            RefreshMessage::RefreshError(error) => {
                self.last_error = Some(error);
                self.leave_loading();
            }
            RefreshMessage::RefreshCompleted => {
                self.refreshing = false;
            }
        }
    }

    /// Replaces the shown quakes
    ///
    /// The selection follows the selected event to its new position. If that
    /// event is gone, an open detail view closes.
    fn set_quakes(&mut self, quakes: Vec<Quake>) {
        let previous = self.selected_quake().cloned();
        self.quakes = quakes;

        let found = previous.and_then(|prev| {
            self.quakes
                .iter()
                .position(|quake| quake.is_same_event(&prev))
        });

        match found {
            Some(index) => {
                self.selected_index = index;
                if let AppState::QuakeDetail(_) = self.state {
                    self.state = AppState::QuakeDetail(index);
                }
            }
            None => {
                if self.selected_index >= self.quakes.len() {
                    self.selected_index = self.quakes.len().saturating_sub(1);
                }
                if let AppState::QuakeDetail(_) = self.state {
                    self.state = AppState::QuakeList;
                }
            }
        }
    }

    fn leave_loading(&mut self) {
        if self.state == AppState::Loading {
            self.state = AppState::QuakeList;
        }
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Arguments
    /// * `key_event` - The keyboard event to handle
    ///
    /// # Key Bindings
    /// - `q`: Quit the application
    /// - `Esc` (in QuakeList): Quit the application
    /// - `Up`/`k`, `Down`/`j`: Move selection (also in detail view)
    /// - `g`/`G`: Jump to first/last quake
    /// - `Enter`: Open the selected quake's details
    /// - `Esc` (in QuakeDetail): Go back to list view
    /// - `r`: Refresh now
    /// - `?`: Toggle help
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // Handle help overlay - intercepts all keys when shown
        if self.show_help {
            match key_event.code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                    self.show_help = false;
                }
                _ => {}
            }
            return;
        }

        match self.state {
            AppState::Loading => {
                // Only quit is allowed during loading
                if key_event.code == KeyCode::Char('q') {
                    self.should_quit = true;
                }
            }
            AppState::QuakeList => match key_event.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.move_selection_up();
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.move_selection_down();
                }
                KeyCode::Char('g') => {
                    self.selected_index = 0;
                }
                KeyCode::Char('G') => {
                    self.selected_index = self.quake_count().saturating_sub(1);
                }
                KeyCode::Enter => {
                    if self.selected_quake().is_some() {
                        self.state = AppState::QuakeDetail(self.selected_index);
                    }
                }
                KeyCode::Char('r') => {
                    self.refresh_requested = true;
                }
                KeyCode::Char('?') => {
                    self.show_help = true;
                }
                _ => {}
            },
            AppState::QuakeDetail(_) => match key_event.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                }
                KeyCode::Esc => {
                    self.state = AppState::QuakeList;
                }
                // Step through quakes without leaving the detail view
                KeyCode::Up | KeyCode::Char('k') => {
                    self.move_selection_up();
                    self.state = AppState::QuakeDetail(self.selected_index);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.move_selection_down();
                    self.state = AppState::QuakeDetail(self.selected_index);
                }
                KeyCode::Char('r') => {
                    self.refresh_requested = true;
                }
                KeyCode::Char('?') => {
                    self.show_help = true;
                }
                _ => {}
            },
        }
    }

    /// Moves the selection up in the list, wrapping to bottom if at top
    fn move_selection_up(&mut self) {
        let count = self.quake_count();
        if count == 0 {
            return;
        }
        if self.selected_index == 0 {
            self.selected_index = count - 1;
        } else {
            self.selected_index -= 1;
        }
    }

    /// Moves the selection down in the list, wrapping to top if at bottom
    fn move_selection_down(&mut self) {
        let count = self.quake_count();
        if count == 0 {
            return;
        }
        self.selected_index = (self.selected_index + 1) % count;
    }

    /// Returns and clears the pending refresh request
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }
}
