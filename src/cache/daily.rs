//! Per-day in-memory cache of fetched quakes
//!
//! Entries are keyed by the local calendar day of the fetch (`dd.MM.yyyy`).
//! A new day naturally starts with an empty slot; old days are never evicted.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, TimeZone};

use crate::data::Quake;

/// Format of cache keys (e.g. "22.07.2023")
const DAY_KEY_FORMAT: &str = "%d.%m.%Y";

/// Returns the cache key for the calendar day containing `now`
///
/// The day is taken in `now`'s own timezone.
pub fn day_key<Tz>(now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    now.format(DAY_KEY_FORMAT).to_string()
}

/// Latest successful result set per calendar day
///
/// Safe to share between tasks; writers to different days never interfere.
#[derive(Debug, Default)]
pub struct DailyCache {
    entries: RwLock<HashMap<String, Vec<Quake>>>,
}

impl DailyCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the quakes cached for `day_key`
    pub fn get(&self, day_key: &str) -> Option<Vec<Quake>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(day_key).cloned()
    }

    /// Stores `quakes` for `day_key`, replacing any previous entry
    pub fn put(&self, day_key: impl Into<String>, quakes: Vec<Quake>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(day_key.into(), quakes);
    }

    /// Number of days with an entry
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no day has an entry yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
