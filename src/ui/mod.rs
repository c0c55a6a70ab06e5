//! UI rendering module for quakewatch
//!
//! This module contains all the rendering logic for the terminal user interface,
//! using the ratatui library for TUI components.

pub mod help_overlay;
pub mod quake_detail;
pub mod quake_list;

pub use help_overlay::render as render_help_overlay;
pub use quake_detail::render as render_quake_detail;
pub use quake_list::{render_quake_list, severity_color};
