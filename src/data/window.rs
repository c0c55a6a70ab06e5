//! Time window for feed queries
//!
//! A `QueryWindow` covers the last N days up to a reference instant. The feed
//! expects both bounds as UTC timestamps in ISO 8601 form.

use chrono::{DateTime, Duration, Utc};

use super::FetchError;

/// Default lookback in days
pub const DEFAULT_DAYS_BACK: u32 = 30;

/// Timestamp format for the `starttime`/`endtime` query parameters
const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Half-open time range `[start, end)` to request events for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    /// Earliest event time to include
    pub start: DateTime<Utc>,
    /// Latest event time to include
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    /// Creates a window from explicit bounds
    ///
    /// Returns `FetchError::DateMath` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, FetchError> {
        if start >= end {
            return Err(FetchError::DateMath(format!(
                "window start {} is not before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Creates a window covering `days` days back from `now`
    ///
    /// # Returns
    /// * `Ok(QueryWindow)` with `end == now` and `end - start == days` days
    /// * `Err(FetchError::DateMath)` if `days` is zero or the start falls
    ///   outside the representable date range
    pub fn days_back(days: u32, now: DateTime<Utc>) -> Result<Self, FetchError> {
        if days == 0 {
            return Err(FetchError::DateMath(
                "lookback must be at least one day".to_string(),
            ));
        }

        let span = Duration::try_days(i64::from(days))
            .ok_or_else(|| FetchError::DateMath(format!("{} days is out of range", days)))?;

        let start = now.checked_sub_signed(span).ok_or_else(|| {
            FetchError::DateMath(format!("cannot go back {} days from {}", days, now))
        })?;

        Self::new(start, now)
    }

    /// Creates a window covering `days` days back from the current time
    pub fn ending_now(days: u32) -> Result<Self, FetchError> {
        Self::days_back(days, Utc::now())
    }

    /// Length of the window
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// `starttime` query value
    pub fn start_param(&self) -> String {
        self.start.format(QUERY_TIME_FORMAT).to_string()
    }

    /// `endtime` query value
    pub fn end_param(&self) -> String {
        self.end.format(QUERY_TIME_FORMAT).to_string()
    }
}
