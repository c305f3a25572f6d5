use thiserror::Error;

/// Low-level failure reported by a transport before any HTTP status was seen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established (DNS, refused, TLS handshake).
    #[error("connection failed: {0}")]
    Connect(String),
    /// The connection broke while sending the request or reading the body.
    #[error("transport failed: {0}")]
    Io(String),
    /// The request could not be built (bad header, bad URL); retrying cannot help.
    #[error("invalid request: {0}")]
    Request(String),
}

impl TransportError {
    /// Whether another attempt may succeed where this one failed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Io(_))
    }
}

/// Unified error type for the lumen workspace.
///
/// The first four variants are the terminal classification produced by the
/// request executor once its retry budget is spent; the rest describe
/// configuration and payload problems.
#[derive(Debug, Clone, Error)]
pub enum LumenError {
    /// The last attempt exceeded its deadline and no attempts remained.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// Per-attempt deadline that was exceeded.
        timeout_ms: u64,
    },

    /// The service answered with a non-2xx status that was not retried further.
    #[error("http error: status {status}")]
    Http {
        /// HTTP status code of the final response.
        status: u16,
        /// Error document returned by the service, when it sent JSON.
        body: Option<serde_json::Value>,
    },

    /// Transport failure that was not recovered by retrying.
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// The caller's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,

    /// A successful response declared JSON but could not be parsed.
    #[error("decode error: {0}")]
    Decode(String),

    /// The payload did not have the shape an endpoint expects.
    #[error("data issue: {0}")]
    Data(String),

    /// Invalid input argument or configuration.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl LumenError {
    /// Helper: build a `Timeout` error from a deadline.
    #[must_use]
    pub fn timeout(deadline: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Helper: build an `Http` error without a body.
    #[must_use]
    pub const fn http(status: u16) -> Self {
        Self::Http { status, body: None }
    }

    /// Helper: build a `Data` error from a message.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Helper: build an `InvalidArg` error from a message.
    pub fn invalid_arg(msg: impl Into<String>) -> Self {
        Self::InvalidArg(msg.into())
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure class is one the executor retries while it has budget.
    ///
    /// Cancellation is never retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http { status, .. } => is_retryable_status(*status),
            Self::Network(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// 429 and every 5xx are worth another attempt.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}
