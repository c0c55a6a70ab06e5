//! Cache module for same-day quake results
//!
//! Holds the most recent successful fetch for each calendar day in memory.
//! Nothing is written to disk; the cache lives as long as the process.

mod daily;

pub use daily::{day_key, DailyCache};
