//! Core data models for quakewatch
//!
//! This module contains the earthquake record type handed to the UI, plus the
//! feed client and query window used to fetch it.

pub mod feed;
pub mod window;

pub use feed::{decode_feed, FeedClient, FetchError, QuakeFeed, USGS_QUERY_URL};
pub use window::{QueryWindow, DEFAULT_DAYS_BACK};

use chrono::{DateTime, Local, Utc};

/// Title shown for events the feed did not attach a place to
const UNKNOWN_PLACE: &str = "Unknown location";

/// Geographic position of an event's epicentre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

/// A single earthquake reported by the feed
#[derive(Debug, Clone, PartialEq)]
pub struct Quake {
    /// Magnitude as reported by the feed
    pub magnitude: f64,
    /// Human-readable place description (e.g. "10km N of Test")
    pub place: Option<String>,
    /// When the event occurred
    pub occurred_at: DateTime<Utc>,
    /// Link to the event's detail page
    pub detail_url: Option<String>,
    /// Epicentre
    pub location: Location,
}

impl Quake {
    /// Primary line for list rows and map annotations
    pub fn title(&self) -> &str {
        self.place.as_deref().unwrap_or(UNKNOWN_PLACE)
    }

    /// Secondary line: the event time in the local timezone
    pub fn subtitle(&self) -> String {
        self.occurred_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }

    /// Severity bucket used for styling
    pub fn severity(&self) -> Severity {
        Severity::from_magnitude(self.magnitude)
    }

    /// Whether `other` describes the same event
    ///
    /// Events are matched by detail URL when both have one, otherwise by
    /// origin time and epicentre. Magnitude and place may be revised between
    /// fetches and are ignored.
    pub fn is_same_event(&self, other: &Quake) -> bool {
        match (&self.detail_url, &other.detail_url) {
            (Some(a), Some(b)) => a == b,
            _ => self.occurred_at == other.occurred_at && self.location == other.location,
        }
    }
}

/// Severity classes derived from magnitude
///
/// Boundaries follow the usual descriptive magnitude classes; each class covers
/// `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Below 3.0
    Minor,
    /// 3.0 to 4.0
    Light,
    /// 4.0 to 5.0
    Moderate,
    /// 5.0 to 6.0
    Strong,
    /// 6.0 to 7.0
    Major,
    /// 7.0 and above
    Great,
}

impl Severity {
    /// Classifies a magnitude. Non-finite values are treated as `Minor`.
    pub fn from_magnitude(magnitude: f64) -> Self {
        if !magnitude.is_finite() || magnitude < 3.0 {
            Severity::Minor
        } else if magnitude < 4.0 {
            Severity::Light
        } else if magnitude < 5.0 {
            Severity::Moderate
        } else if magnitude < 6.0 {
            Severity::Strong
        } else if magnitude < 7.0 {
            Severity::Major
        } else {
            Severity::Great
        }
    }

    /// Short display label
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Minor => "Minor",
            Severity::Light => "Light",
            Severity::Moderate => "Moderate",
            Severity::Strong => "Strong",
            Severity::Major => "Major",
            Severity::Great => "Great",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_quake(magnitude: f64, place: Option<&str>) -> Quake {
        Quake {
            magnitude,
            place: place.map(str::to_string),
            occurred_at: Utc.timestamp_millis_opt(1_690_000_000_000).unwrap(),
            detail_url: Some("http://example.com/1".to_string()),
            location: Location {
                latitude: 37.7,
                longitude: -122.4,
            },
        }
    }

    #[test]
    fn test_title_uses_place() {
        let quake = sample_quake(4.5, Some("10km N of Test"));
        assert_eq!(quake.title(), "10km N of Test");
    }

    #[test]
    fn test_title_falls_back_when_place_missing() {
        let quake = sample_quake(4.5, None);
        assert_eq!(quake.title(), "Unknown location");
    }

    #[test]
    fn test_subtitle_formats_local_time() {
        let quake = sample_quake(4.5, None);
        let expected = quake
            .occurred_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();

        assert_eq!(quake.subtitle(), expected);
        assert!(quake.subtitle().starts_with("2023-07-"));
    }

    #[test]
    fn test_same_event_matches_by_url_despite_revision() {
        let original = sample_quake(4.5, Some("10km N of Test"));
        let mut revised = original.clone();
        revised.magnitude = 4.7;
        revised.place = Some("9km N of Test".to_string());

        assert!(original.is_same_event(&revised));

        revised.detail_url = Some("http://example.com/2".to_string());
        assert!(!original.is_same_event(&revised));
    }

    #[test]
    fn test_same_event_without_url_uses_time_and_location() {
        let mut a = sample_quake(2.0, None);
        a.detail_url = None;
        let mut b = a.clone();
        assert!(a.is_same_event(&b));

        b.location.latitude += 0.1;
        assert!(!a.is_same_event(&b));
    }

    #[test]
    fn test_severity_boundaries() {
        assert_eq!(Severity::from_magnitude(-0.5), Severity::Minor);
        assert_eq!(Severity::from_magnitude(2.99), Severity::Minor);
        assert_eq!(Severity::from_magnitude(3.0), Severity::Light);
        assert_eq!(Severity::from_magnitude(4.0), Severity::Moderate);
        assert_eq!(Severity::from_magnitude(4.5), Severity::Moderate);
        assert_eq!(Severity::from_magnitude(5.0), Severity::Strong);
        assert_eq!(Severity::from_magnitude(6.9), Severity::Major);
        assert_eq!(Severity::from_magnitude(7.0), Severity::Great);
        assert_eq!(Severity::from_magnitude(9.5), Severity::Great);
    }

    #[test]
    fn test_severity_non_finite_is_minor() {
        assert_eq!(Severity::from_magnitude(f64::NAN), Severity::Minor);
        assert_eq!(Severity::from_magnitude(f64::INFINITY), Severity::Minor);
    }

    #[test]
    fn test_severity_ordering_tracks_magnitude() {
        assert!(Severity::Minor < Severity::Light);
        assert!(Severity::Strong < Severity::Great);
        assert!(sample_quake(6.2, None).severity() > sample_quake(4.1, None).severity());
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(Severity::Moderate.label(), "Moderate");
        assert_eq!(Severity::Great.label(), "Great");
    }
}
