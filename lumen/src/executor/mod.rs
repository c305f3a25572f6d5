//! Request executor: timeout, bounded linear-backoff retry, read caching and
//! cooperative cancellation around a [`Transport`].
//!
//! Each call derives a child of the caller's cancellation token and drives a
//! [`CallMachine`]. Per-attempt timers and the in-flight transport future live
//! inside the attempt's `select!`, so whichever side loses is dropped on the
//! spot: a timeout or cancellation aborts the exchange and a finished exchange
//! releases its timer.

mod config;
pub mod machine;

use std::sync::Arc;
use std::time::Duration;

use lumen_core::{
    CacheStore, CancellationToken, HttpRequest, HttpResponse, LumenError, MemoryCacheStore,
    Payload, Transport, TransportError,
};
use serde::de::DeserializeOwned;

pub use config::RequestConfig;
pub use machine::{Action, CallMachine, Event, Failure, Phase};

enum AttemptOutcome {
    Response(HttpResponse),
    TimedOut,
    Transport(TransportError),
    Cancelled,
}

/// Issues logical requests against a transport and a cache store.
///
/// The cache store is injected; executors built with separate stores share
/// nothing. Concurrent calls for the same key are not coalesced: both reach
/// the network and the later completion overwrites the earlier cache entry.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheStore>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("transport", &self.transport.name())
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Executor over `transport` sharing `cache`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<dyn CacheStore>) -> Self {
        Self { transport, cache }
    }

    /// Executor over `transport` with a fresh in-memory cache.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self::new(transport, Arc::new(MemoryCacheStore::new()))
    }

    /// The injected cache store.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Perform one logical request and decode the body by content type.
    ///
    /// # Errors
    /// Returns the terminal classification once retries are spent:
    /// `Timeout`, `Http`, `Network`, or `Cancelled` (which is never retried
    /// and wins over any pending retry or success). A 2xx body that declares
    /// JSON but does not parse yields `Decode`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "lumen::executor::execute",
            skip(self, cfg),
            fields(method = %cfg.method, max_attempts = cfg.max_attempts()),
        )
    )]
    pub async fn execute(&self, url: &str, cfg: &RequestConfig) -> Result<Payload, LumenError> {
        let cacheable = cfg.is_cacheable();
        let cache_key = cfg.resolve_cache_key(url);

        if cacheable && let Some(hit) = self.cache.get(&cache_key).await {
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "lumen::executor", key = %cache_key, "cache hit");
            return Ok(hit);
        }

        let token = cfg
            .cancellation
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        let request = HttpRequest {
            method: cfg.method,
            url: url.to_string(),
            headers: cfg.headers.clone(),
            body: cfg.body.clone(),
        };

        let mut machine = CallMachine::new(cfg.max_attempts(), cfg.retry_delay);
        let mut event = Event::Start;
        let mut delivered: Option<Payload> = None;
        let mut error_body: Option<serde_json::Value> = None;
        let mut transport_error: Option<TransportError> = None;

        loop {
            let (next, action) = machine.handle(event);
            machine = next;
            let Some(action) = action else {
                return Err(LumenError::Other(format!(
                    "request state machine stalled in {:?}",
                    machine.phase()
                )));
            };

            event = match action {
                Action::Attempt { attempt: _attempt } => {
                    if token.is_cancelled() {
                        Event::CancelRequested
                    } else {
                        match self.attempt(&request, cfg.timeout, &token).await {
                            _ if token.is_cancelled() => Event::CancelRequested,
                            AttemptOutcome::Cancelled => Event::CancelRequested,
                            AttemptOutcome::Response(resp) => {
                                let status = resp.status;
                                if resp.is_success() {
                                    delivered = Some(Payload::from_response(&resp)?);
                                } else {
                                    #[cfg(feature = "tracing")]
                                    tracing::debug!(target: "lumen::executor", attempt = _attempt, status, "non-success status");
                                    error_body = resp.json_body();
                                }
                                Event::Response { status }
                            }
                            AttemptOutcome::TimedOut => {
                                #[cfg(feature = "tracing")]
                                tracing::debug!(target: "lumen::executor", attempt = _attempt, "attempt timed out");
                                Event::TimedOut
                            }
                            AttemptOutcome::Transport(err) => {
                                #[cfg(feature = "tracing")]
                                tracing::debug!(target: "lumen::executor", attempt = _attempt, error = %err, "transport failure");
                                let transient = err.is_transient();
                                transport_error = Some(err);
                                Event::TransportFailed { transient }
                            }
                        }
                    }
                }
                Action::Wait {
                    delay,
                    next_attempt: _next_attempt,
                } => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        target: "lumen::executor",
                        next_attempt = _next_attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "retrying after backoff"
                    );
                    Self::backoff(delay, &token).await
                }
                Action::Deliver => {
                    let payload = delivered.take().ok_or_else(|| {
                        LumenError::Other("delivered without a decoded payload".to_string())
                    })?;
                    if cacheable {
                        self.cache
                            .put(cache_key, payload.clone(), cfg.cache_ttl)
                            .await;
                    }
                    return Ok(payload);
                }
                Action::Fail(failure) => {
                    return Err(match failure {
                        Failure::Timeout => LumenError::timeout(cfg.timeout),
                        Failure::Status(status) => LumenError::Http {
                            status,
                            body: error_body.take(),
                        },
                        Failure::Transport => LumenError::Network(transport_error.take().unwrap_or_else(
                            || TransportError::Io("transport failed".to_string()),
                        )),
                        Failure::Cancelled => LumenError::Cancelled,
                    });
                }
            };
        }
    }

    /// [`execute`](Self::execute) and deserialize the payload into `T`.
    ///
    /// # Errors
    /// Everything `execute` returns, plus `Data` when the payload does not match `T`.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cfg: &RequestConfig,
    ) -> Result<T, LumenError> {
        self.execute(url, cfg).await?.into_typed()
    }

    async fn attempt(
        &self,
        request: &HttpRequest,
        timeout: Duration,
        token: &CancellationToken,
    ) -> AttemptOutcome {
        tokio::select! {
            biased;
            () = token.cancelled() => AttemptOutcome::Cancelled,
            res = tokio::time::timeout(timeout, self.transport.send(request)) => match res {
                Err(_) => AttemptOutcome::TimedOut,
                Ok(Ok(resp)) => AttemptOutcome::Response(resp),
                Ok(Err(err)) => AttemptOutcome::Transport(err),
            },
        }
    }

    async fn backoff(delay: Duration, token: &CancellationToken) -> Event {
        tokio::select! {
            biased;
            () = token.cancelled() => Event::CancelRequested,
            () = tokio::time::sleep(delay) => Event::BackoffElapsed,
        }
    }
}
