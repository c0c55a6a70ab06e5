//! Command-line interface parsing for quakewatch
//!
//! Parses arguments with clap and validates them into the configuration the
//! fetcher and background refresh are built from.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::data::feed::{parse_base_url, DEFAULT_TIMEOUT_SECS};
use crate::data::{DEFAULT_DAYS_BACK, USGS_QUERY_URL};
use crate::fetcher::FetchConfig;
use crate::gate::DEFAULT_MAX_CONCURRENT;
use crate::refresh::{RefreshConfig, DEFAULT_REFRESH_SECS};

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// Lookback of zero days
    #[error("Invalid --days: must be at least 1")]
    InvalidDays,

    /// Gate capacity of zero
    #[error("Invalid --max-concurrent: must be at least 1")]
    InvalidConcurrency,

    /// Request timeout of zero
    #[error("Invalid --timeout: must be at least 1 second")]
    InvalidTimeout,

    /// Feed endpoint that is not an http(s) URL
    #[error("Invalid --feed-url '{0}'")]
    InvalidFeedUrl(String),
}

/// quakewatch - recent earthquakes from the USGS feed
#[derive(Parser, Debug)]
#[command(name = "quakewatch")]
#[command(about = "Recent earthquakes from the USGS event feed")]
#[command(version)]
pub struct Cli {
    /// Number of days of events to show
    #[arg(long, default_value_t = DEFAULT_DAYS_BACK)]
    pub days: u32,

    /// Maximum number of feed requests in flight at once
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_CONCURRENT)]
    pub max_concurrent: usize,

    /// Feed query endpoint. Each event's coordinates must be a [longitude, latitude]
    /// pair; points that also carry depth fail to decode
    #[arg(long, value_name = "URL", default_value = USGS_QUERY_URL)]
    pub feed_url: String,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Seconds between automatic refreshes (0 disables)
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_REFRESH_SECS)]
    pub refresh_interval: u64,

    /// Write logs to this file (filtered by RUST_LOG)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    /// Fetcher settings
    pub fetch: FetchConfig,
    /// Background refresh settings
    pub refresh: RefreshConfig,
    /// Log destination, if logging is enabled
    pub log_file: Option<PathBuf>,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` if any value is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.days == 0 {
            return Err(CliError::InvalidDays);
        }
        if cli.max_concurrent == 0 {
            return Err(CliError::InvalidConcurrency);
        }
        if cli.timeout == 0 {
            return Err(CliError::InvalidTimeout);
        }
        parse_base_url(&cli.feed_url)
            .map_err(|_| CliError::InvalidFeedUrl(cli.feed_url.clone()))?;

        let refresh = if cli.refresh_interval == 0 {
            RefreshConfig {
                enabled: false,
                ..Default::default()
            }
        } else {
            RefreshConfig {
                interval: Duration::from_secs(cli.refresh_interval),
                enabled: true,
            }
        };

        Ok(StartupConfig {
            fetch: FetchConfig {
                feed_url: cli.feed_url.clone(),
                days_back: cli.days,
                max_concurrent: cli.max_concurrent,
                timeout: Duration::from_secs(cli.timeout),
            },
            refresh,
            log_file: cli.log_file.clone(),
        })
    }
}
