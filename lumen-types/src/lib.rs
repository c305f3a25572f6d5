//! Lumen data transfer objects, configuration primitives and the shared error type.
#![warn(missing_docs)]

mod config;
mod error;
mod sample;
mod service;

pub use config::{DEFAULT_VALUE_FIELD, LumenConfig, RequestDefaults};
pub use error::{LumenError, TransportError, is_retryable_status};
pub use sample::{AggregatedPoint, BucketInterval, Sample};
pub use service::{
    HeatmapCell, ReadingReceipt, ReportRange, ReportRow, SensorId, SeriesQuery, TimeWindow,
};
