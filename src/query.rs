//! Relative-time query translation.
//!
//! The `fromWhen` token on a read request decides between two query
//! modes: an empty token means "latest", and `<integer>h` / `<integer>m`
//! means "everything in the last N hours/minutes". Window thresholds are
//! rendered in the same canonical timestamp form the store holds, so the
//! store compares them as plain text.

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Utc};

/// Threshold floor: lexicographically below every canonical timestamp,
/// so every record qualifies.
const THRESHOLD_FLOOR: &str = "0000-01-01T00:00:00.000000Z";

/// Threshold ceiling: lexicographically above every canonical timestamp,
/// so no record qualifies.
const THRESHOLD_CEILING: &str = "9999-12-31T23:59:59.999999Z";

/// Unit of a window token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    Hours,
    Minutes,
}

/// Parsed query mode for a read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Return the single most recent record.
    Latest,
    /// Return every record newer than `now - magnitude * unit`.
    Window { unit: WindowUnit, magnitude: i64 },
}

impl QueryMode {
    /// Parse a `fromWhen` token.
    ///
    /// An empty token selects latest mode; `<integer>h` and `<integer>m`
    /// select a window (the magnitude may be zero or negative, which
    /// yields an empty window). Returns `None` for anything else.
    pub fn parse(from_when: &str) -> Option<Self> {
        if from_when.is_empty() {
            return Some(Self::Latest);
        }

        if let Some(prefix) = from_when.strip_suffix('h') {
            let magnitude = prefix.parse::<i64>().ok()?;
            return Some(Self::Window {
                unit: WindowUnit::Hours,
                magnitude,
            });
        }

        if let Some(prefix) = from_when.strip_suffix('m') {
            let magnitude = prefix.parse::<i64>().ok()?;
            return Some(Self::Window {
                unit: WindowUnit::Minutes,
                magnitude,
            });
        }

        None
    }
}

/// Compute the window threshold `now - magnitude * unit` as a canonical
/// timestamp string.
///
/// Magnitudes whose threshold falls outside the four-digit-year range
/// clamp to the floor (huge positive magnitude: everything qualifies) or
/// the ceiling (huge negative magnitude: nothing qualifies). Years
/// outside 0..=9999 would render with five or more digits and break the
/// text comparison.
pub fn window_threshold(unit: WindowUnit, magnitude: i64, now: DateTime<Utc>) -> String {
    let offset = match unit {
        WindowUnit::Hours => Duration::try_hours(magnitude),
        WindowUnit::Minutes => Duration::try_minutes(magnitude),
    };

    let threshold = offset.and_then(|offset| now.checked_sub_signed(offset));

    match threshold {
        Some(threshold) if (0..=9999).contains(&threshold.year()) => format_timestamp(threshold),
        _ if magnitude >= 0 => THRESHOLD_FLOOR.to_string(),
        _ => THRESHOLD_CEILING.to_string(),
    }
}

/// Render a timestamp in the canonical form: RFC 3339 UTC with exactly
/// six fractional digits and a `Z` suffix, e.g.
/// `2026-08-25T10:15:30.123456Z`. The rendering is fixed-width, so
/// lexicographic order equals chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The current instant in canonical form.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}
