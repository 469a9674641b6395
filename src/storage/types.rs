//! Core data types for the storage layer.
//!
//! This module defines the primary data structures used throughout the store:
//!
//! - [`TelemetryRecord`]: one stored observation within a stream
//! - [`ScalarValue`]: the string/integer/float union a record's value can take

use serde::{Deserialize, Serialize};

/// A single observation stored under a (component, parameter) stream.
///
/// Records are append-only: they are written once and never updated or
/// deleted. The struct is also the wire shape of a record in API
/// responses; the store's row id never appears here.
///
/// # Example
///
/// ```
/// use gauge::{ScalarValue, TelemetryRecord};
///
/// let record = TelemetryRecord {
///     display_name: "Coolant temperature".to_string(),
///     category: "Drivecontroller".to_string(),
///     value: ScalarValue::Float(47.3),
///     unit: "degC".to_string(),
///     timestamp: "2026-08-25T10:15:30.000000Z".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Human-readable label for the parameter.
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Grouping tag (e.g., "Drivecontroller").
    pub category: String,
    /// The observed value.
    pub value: ScalarValue,
    /// Measurement unit; may be empty.
    pub unit: String,
    /// ISO-8601 UTC timestamp. Fixed-width rendering, so string
    /// comparison matches chronological order.
    pub timestamp: String,
}

impl TelemetryRecord {
    /// Create a new record.
    pub fn new(
        display_name: impl Into<String>,
        category: impl Into<String>,
        value: ScalarValue,
        unit: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            category: category.into(),
            value,
            unit: unit.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// Scalar value carried by a telemetry record.
///
/// Serialized untagged, so the wire shape is the bare JSON scalar.
/// `Integer` is listed before `Float`: untagged deserialization tries
/// variants in order, and a whole number like `2` must come back as an
/// integer, not `2.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Whole-number value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Free-form text value.
    Text(String),
}

impl ScalarValue {
    /// The contained integer, if this value is one.
    ///
    /// Floats are not coerced: `2.0` is not an integer here.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Encode for the TEXT value column.
    pub(crate) fn to_column(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from the TEXT value column.
    ///
    /// Rows written by an external ingester may hold values that are not
    /// valid JSON; those pass through unchanged as text instead of
    /// failing the read.
    pub(crate) fn from_column(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, raw, "Unparseable value column, passing through as text");
            Self::Text(raw.to_string())
        })
    }
}
