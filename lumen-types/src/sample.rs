use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::LumenError;

/// One raw reading as returned by the data service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Instant the reading was taken.
    pub ts: DateTime<Utc>,
    /// Measured value (lux for the stock service).
    pub value: f64,
}

impl Sample {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(ts: DateTime<Utc>, value: f64) -> Self {
        Self { ts, value }
    }
}

/// Mean of every sample whose local time falls inside
/// `[bucket_start, bucket_start + interval)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    /// Start of the bucket.
    pub bucket_start: DateTime<Utc>,
    /// Arithmetic mean of the bucket's samples.
    pub value: f64,
    /// Number of samples that contributed to `value`.
    pub count: usize,
}

/// Width of an aggregation bucket in whole minutes; never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BucketInterval(NonZeroU32);

impl BucketInterval {
    /// Build an interval from a minute count.
    ///
    /// # Errors
    /// Returns `LumenError::InvalidArg` when `minutes` is zero.
    pub fn new(minutes: u32) -> Result<Self, LumenError> {
        NonZeroU32::new(minutes)
            .map(Self)
            .ok_or_else(|| LumenError::invalid_arg("bucket interval must be at least one minute"))
    }

    /// Interval width in minutes.
    #[must_use]
    pub const fn minutes(self) -> u32 {
        self.0.get()
    }
}

impl Default for BucketInterval {
    fn default() -> Self {
        Self(NonZeroU32::MIN.saturating_add(1))
    }
}

impl TryFrom<u32> for BucketInterval {
    type Error = LumenError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        Self::new(minutes)
    }
}

impl From<BucketInterval> for u32 {
    fn from(interval: BucketInterval) -> Self {
        interval.minutes()
    }
}

impl std::fmt::Display for BucketInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m", self.minutes())
    }
}
