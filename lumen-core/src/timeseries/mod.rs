//! Time-series utilities used on raw service samples.
//!
//! Modules include:
//! - `bucket`: calendar-local fixed-width bucketing with per-bucket means
/// Fixed-width bucket aggregation.
pub mod bucket;
