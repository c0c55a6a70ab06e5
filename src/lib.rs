//! quakewatch library
//!
//! Fetches recent earthquakes from the USGS event feed, caches each day's
//! result in memory and renders them in a terminal UI.

pub mod app;
pub mod cache;
pub mod cli;
pub mod data;
pub mod fetcher;
pub mod gate;
pub mod refresh;
pub mod ui;
