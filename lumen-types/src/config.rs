//! Configuration shared by the executor, client and pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::BucketInterval;

/// Field that carries the measurement in series rows unless configured otherwise.
pub const DEFAULT_VALUE_FIELD: &str = "lux";

/// Per-call defaults applied by the request executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDefaults {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Additional attempts after the first.
    pub retries: u32,
    /// Backoff unit; the wait before attempt `n + 1` is `retry_delay * n`.
    pub retry_delay: Duration,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(7000),
            retries: 1,
            retry_delay: Duration::from_millis(350),
        }
    }
}

/// Global configuration for a `Lumen` client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LumenConfig {
    /// Base URL of the data service, e.g. `http://localhost:3000`.
    pub base_url: String,
    /// Timeout and retry defaults.
    pub request: RequestDefaults,
    /// Cache lifetime for series reads; zero disables caching.
    pub series_cache_ttl: Duration,
    /// Cache lifetime for heatmap reads; zero disables caching.
    pub heatmap_cache_ttl: Duration,
    /// Cache lifetime for report reads; zero disables caching.
    pub reports_cache_ttl: Duration,
    /// Quiescence delay applied to parameter changes before fetching.
    pub debounce_delay: Duration,
    /// Width of client-side aggregation buckets.
    pub bucket_interval: BucketInterval,
    /// Reference zone whose calendar defines bucket boundaries.
    pub time_zone: chrono_tz::Tz,
    /// Name of the measurement field in series rows.
    pub value_field: String,
}

impl Default for LumenConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request: RequestDefaults::default(),
            series_cache_ttl: Duration::from_secs(15),
            heatmap_cache_ttl: Duration::ZERO,
            reports_cache_ttl: Duration::from_secs(60),
            debounce_delay: Duration::from_millis(250),
            bucket_interval: BucketInterval::default(),
            time_zone: chrono_tz::UTC,
            value_field: DEFAULT_VALUE_FIELD.to_string(),
        }
    }
}
