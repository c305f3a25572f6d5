//! lumen-core
//!
//! Building blocks shared by the lumen client:
//!
//! - `transport`: the `Transport` seam plus HTTP request/response value types.
//! - `cache`: the injectable response cache store.
//! - `timeseries`: client-side time-bucket aggregation.
//! - `debounce`: a quiescence gate for rapidly changing parameters.
//! - `task`: scheduled background tasks that stop and abort on drop.
//!
//! Async runtime (Tokio)
//! ---------------------
//! Timers, the debounce gate and scheduled tasks are built on Tokio 1.x and
//! cancellation is expressed with `tokio_util::sync::CancellationToken`.
#![warn(missing_docs)]

/// Injectable response cache with lazy expiry.
pub mod cache;
/// Quiescence gate for parameter changes.
pub mod debounce;
/// Background tasks with stop-and-abort-on-drop semantics.
pub mod task;
/// Time-bucket aggregation of raw samples.
pub mod timeseries;
/// Transport seam and HTTP value types.
pub mod transport;

pub use cache::{CacheEntry, CacheStore, MemoryCacheStore};
pub use debounce::DebounceGate;
pub use lumen_types::*;
pub use task::ScheduledTask;
pub use timeseries::bucket::{aggregate, aggregate_in};
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpRequest, HttpResponse, Method, Payload, Transport};
