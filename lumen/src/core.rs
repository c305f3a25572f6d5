use std::sync::Arc;
use std::time::Duration;

use lumen_core::{
    BucketInterval, CacheStore, CancellationToken, LumenConfig, LumenError, MemoryCacheStore,
    SeriesQuery, Transport,
};
use tokio::sync::mpsc;

use crate::client::DataServiceClient;
use crate::executor::RequestExecutor;
use crate::pipeline::{PipelineHandle, SeriesPipeline, SeriesUpdate};
use crate::transport::ReqwestTransport;

/// Configured client: executor, data-service endpoints and pipelines sharing one cache.
#[derive(Debug, Clone)]
pub struct Lumen {
    client: DataServiceClient,
}

/// Builder for constructing a [`Lumen`] client with custom configuration.
pub struct LumenBuilder {
    cfg: LumenConfig,
    transport: Option<Arc<dyn Transport>>,
    cache: Option<Arc<dyn CacheStore>>,
}

impl Default for LumenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LumenBuilder {
    /// Create a builder with the documented defaults.
    ///
    /// Without an explicit transport the client talks HTTP through `reqwest`;
    /// without an explicit cache store it gets a private in-memory one.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cfg: LumenConfig::default(),
            transport: None,
            cache: None,
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: LumenConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Base URL of the data service.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.cfg.base_url = url.into();
        self
    }

    /// Per-attempt deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.cfg.request.timeout = timeout;
        self
    }

    /// Additional attempts after the first for retryable failures.
    #[must_use]
    pub const fn retries(mut self, retries: u32) -> Self {
        self.cfg.request.retries = retries;
        self
    }

    /// Backoff unit; the wait before attempt `n + 1` is `delay * n`.
    #[must_use]
    pub const fn retry_delay(mut self, delay: Duration) -> Self {
        self.cfg.request.retry_delay = delay;
        self
    }

    /// Cache lifetime for series reads. Zero disables caching.
    #[must_use]
    pub const fn series_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cfg.series_cache_ttl = ttl;
        self
    }

    /// Cache lifetime for heatmap reads. Zero disables caching.
    #[must_use]
    pub const fn heatmap_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cfg.heatmap_cache_ttl = ttl;
        self
    }

    /// Cache lifetime for report reads. Zero disables caching.
    #[must_use]
    pub const fn reports_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cfg.reports_cache_ttl = ttl;
        self
    }

    /// Quiescence delay for pipeline query changes.
    #[must_use]
    pub const fn debounce_delay(mut self, delay: Duration) -> Self {
        self.cfg.debounce_delay = delay;
        self
    }

    /// Width of aggregation buckets.
    #[must_use]
    pub const fn bucket_interval(mut self, interval: BucketInterval) -> Self {
        self.cfg.bucket_interval = interval;
        self
    }

    /// Zone whose calendar defines bucket boundaries.
    #[must_use]
    pub const fn time_zone(mut self, tz: chrono_tz::Tz) -> Self {
        self.cfg.time_zone = tz;
        self
    }

    /// Name of the measurement field in series rows.
    #[must_use]
    pub fn value_field(mut self, field: impl Into<String>) -> Self {
        self.cfg.value_field = field.into();
        self
    }

    /// Use a custom transport instead of `reqwest`.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share an existing cache store.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// Returns `LumenError::InvalidArg` for an unusable base URL, a zero
    /// per-attempt timeout or an empty value field.
    pub fn build(self) -> Result<Lumen, LumenError> {
        if self.cfg.request.timeout.is_zero() {
            return Err(LumenError::invalid_arg("request timeout must be positive"));
        }
        if self.cfg.value_field.trim().is_empty() {
            return Err(LumenError::invalid_arg("value field must not be empty"));
        }
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCacheStore::new()));
        let executor = RequestExecutor::new(transport, cache);
        let client = DataServiceClient::new(executor, self.cfg)?;
        Ok(Lumen { client })
    }
}

impl Lumen {
    /// Start building a new client.
    #[must_use]
    pub fn builder() -> LumenBuilder {
        LumenBuilder::new()
    }

    /// Data-service endpoints.
    #[must_use]
    pub const fn client(&self) -> &DataServiceClient {
        &self.client
    }

    /// The executor behind every endpoint.
    #[must_use]
    pub const fn executor(&self) -> &RequestExecutor {
        self.client.executor()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &LumenConfig {
        self.client.config()
    }

    /// Spawn a series pipeline with the configured debounce delay.
    ///
    /// See [`SeriesPipeline::spawn`].
    pub fn watch_series(
        &self,
        changes: mpsc::Receiver<SeriesQuery>,
        shutdown: &CancellationToken,
    ) -> (PipelineHandle, mpsc::Receiver<SeriesUpdate>) {
        SeriesPipeline::spawn(
            self.client.clone(),
            self.config().debounce_delay,
            changes,
            shutdown,
        )
    }
}
