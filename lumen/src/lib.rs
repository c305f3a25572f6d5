//! Lumen fetches lux-sensor readings from a data service, resiliently.
//!
//! Overview
//! - `RequestExecutor` wraps a `Transport` with a per-attempt timeout, bounded
//!   linear-backoff retry, a TTL read cache and cooperative cancellation.
//! - `DataServiceClient` exposes the service's series, heatmap, report and
//!   reading-submission endpoints on top of the executor.
//! - `SeriesPipeline` debounces query changes and keeps only the latest
//!   stabilized fetch alive.
//! - `Lumen` ties these together behind a builder.
//!
//! Key behaviors and trade-offs
//! - Retry: only timeouts, transient transport failures, 429 and 5xx are
//!   retried; the wait before attempt `n + 1` is `retry_delay * n`, without jitter.
//! - Cache: entries expire lazily and are never evicted, so the store grows
//!   with the number of distinct keys. Concurrent reads of one key both hit
//!   the network and the later completion wins.
//! - Cancellation: checked before each attempt and during backoff, and wins
//!   over a response that arrives at the same time.
//! - Aggregation: buckets follow the calendar of the configured zone, so a
//!   repeated DST hour folds into the same buckets.
//!
//! Examples
//! ```rust,ignore
//! use std::time::Duration;
//! use lumen::{CancellationToken, Lumen, SeriesQuery, TimeWindow};
//!
//! let lumen = Lumen::builder()
//!     .base_url("http://localhost:3000")
//!     .retries(2)
//!     .series_cache_ttl(Duration::from_secs(15))
//!     .build()?;
//!
//! let token = CancellationToken::new();
//! let points = lumen
//!     .client()
//!     .aggregated_series(&SeriesQuery::new(3, TimeWindow::LastHours(6)), &token)
//!     .await?;
//! ```
//!
//! Tracing
//! - Enable the `tracing` feature to emit spans on requests and events on
//!   retries, timeouts, cache hits and dropped rows.
#![warn(missing_docs)]

/// Data-service endpoints.
pub mod client;
pub(crate) mod core;
/// Request executor and its call state machine.
pub mod executor;
/// Debounced series pipeline.
pub mod pipeline;
/// `reqwest` transport.
pub mod transport;

pub use client::{DataServiceClient, SensorSeries, decode_samples};
pub use crate::core::{Lumen, LumenBuilder};
pub use executor::{RequestConfig, RequestExecutor};
pub use lumen_core::*;
pub use pipeline::{PipelineHandle, SeriesPipeline, SeriesUpdate};
pub use transport::ReqwestTransport;
