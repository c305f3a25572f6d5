//! Shapes exchanged with the sensor data service.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a sensor in the service's grid.
pub type SensorId = u32;

/// Time window requested from the series endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeWindow {
    /// Every reading the service holds for the sensor.
    #[default]
    All,
    /// Readings newer than `now - hours`.
    LastHours(u32),
    /// Readings in `[from, to]`; an open `to` means up to now.
    Between {
        /// Inclusive lower bound.
        from: DateTime<Utc>,
        /// Inclusive upper bound, if any.
        to: Option<DateTime<Utc>>,
    },
}

impl TimeWindow {
    /// Range presets offered by the dashboard selector.
    pub const PRESETS: [Self; 4] = [
        Self::LastHours(1),
        Self::LastHours(6),
        Self::LastHours(12),
        Self::LastHours(24),
    ];

    /// Resolve the window against `now` into optional `(from, to)` bounds.
    #[must_use]
    pub fn bounds(self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self {
            Self::All => (None, None),
            Self::LastHours(h) => (Some(now - Duration::hours(i64::from(h))), None),
            Self::Between { from, to } => (Some(from), to),
        }
    }
}

/// A request for one sensor's series over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesQuery {
    /// Sensor whose readings are requested.
    pub sensor_id: SensorId,
    /// Window of interest.
    pub window: TimeWindow,
}

impl SeriesQuery {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(sensor_id: SensorId, window: TimeWindow) -> Self {
        Self { sensor_id, window }
    }
}

/// Latest reading of one sensor placed on the installation grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    /// Sensor id.
    pub id: SensorId,
    /// Human label of the sensor.
    #[serde(rename = "etiqueta")]
    pub label: String,
    /// Grid row.
    #[serde(rename = "fila")]
    pub row: u32,
    /// Grid column.
    #[serde(rename = "columna")]
    pub column: u32,
    /// Most recent value.
    #[serde(deserialize_with = "number_or_string")]
    pub lux: f64,
    /// When the most recent value was taken.
    pub ts: DateTime<Utc>,
}

/// Aggregation period served by the reports endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportRange {
    /// Per-day rows.
    #[default]
    Day,
    /// Per-week rows.
    Week,
    /// Per-month rows.
    Month,
}

impl ReportRange {
    /// Query-string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl std::fmt::Display for ReportRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a server-side report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Period label (e.g. a date).
    pub key: String,
    /// Mean value over the period.
    #[serde(deserialize_with = "number_or_string")]
    pub avg: f64,
    /// Maximum value over the period.
    #[serde(deserialize_with = "number_or_string")]
    pub max: f64,
    /// Minimum value over the period.
    #[serde(deserialize_with = "number_or_string")]
    pub min: f64,
}

/// Acknowledgement returned after submitting a reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingReceipt {
    /// Whether the service stored the reading.
    pub ok: bool,
    /// Row id assigned by the service.
    #[serde(default)]
    pub id: Option<u64>,
}

// NUMERIC columns arrive as JSON strings.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}
