use std::time::Duration;

use lumen_core::{CancellationToken, LumenError, Method, RequestDefaults};
use serde::Serialize;

/// Options for one logical request. Immutable once handed to the executor.
///
/// Defaults: `GET`, 7000 ms per-attempt timeout, one retry, 350 ms backoff
/// unit, caching disabled.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub(crate) method: Method,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) timeout: Duration,
    pub(crate) retries: u32,
    pub(crate) retry_delay: Duration,
    pub(crate) cache_ttl: Duration,
    pub(crate) cache_key: Option<String>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self::from(RequestDefaults::default())
    }
}

impl From<RequestDefaults> for RequestConfig {
    fn from(d: RequestDefaults) -> Self {
        Self {
            method: Method::Get,
            headers: Vec::new(),
            body: None,
            timeout: d.timeout,
            retries: d.retries,
            retry_delay: d.retry_delay,
            cache_ttl: Duration::ZERO,
            cache_key: None,
            cancellation: None,
        }
    }
}

impl RequestConfig {
    /// Start from the documented defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP verb.
    #[must_use]
    pub const fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a header, forwarded verbatim.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the raw body, forwarded verbatim.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body and set the content type.
    ///
    /// # Errors
    /// Returns `LumenError::InvalidArg` if `value` cannot be serialized.
    pub fn json_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, LumenError> {
        let bytes = serde_json::to_vec(value).map_err(|e| LumenError::invalid_arg(e.to_string()))?;
        Ok(self.header("content-type", "application/json").body(bytes))
    }

    /// Per-attempt deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Additional attempts after the first.
    #[must_use]
    pub const fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Backoff unit; the wait before attempt `n + 1` is `retry_delay * n`.
    #[must_use]
    pub const fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Cache lifetime for successful reads; zero disables caching.
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Override the default `METHOD:url` cache key.
    #[must_use]
    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Token whose cancellation aborts the call.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Total attempts allowed: `retries + 1`, never less than one.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Only reads with a positive TTL touch the cache.
    #[must_use]
    pub const fn is_cacheable(&self) -> bool {
        self.method.is_cacheable_read() && !self.cache_ttl.is_zero()
    }

    /// Explicit cache key, else `METHOD:url`.
    #[must_use]
    pub fn resolve_cache_key(&self, url: &str) -> String {
        self.cache_key
            .clone()
            .unwrap_or_else(|| format!("{}:{url}", self.method))
    }
}
