//! Scripted [`Transport`] for tests and offline demos.
//!
//! Each call pops the next [`Step`] from the script. Calls are recorded with
//! the (Tokio) instant they started, so tests running on a paused clock can
//! assert exact backoff spacing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lumen_core::{HttpRequest, HttpResponse, Transport, TransportError};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Instruction for how one call behaves.
#[derive(Clone, Debug)]
pub enum Step {
    /// Return the response immediately.
    Respond(HttpResponse),
    /// Return the response after a delay (simulates a slow service).
    RespondAfter(Duration, HttpResponse),
    /// Fail immediately with the transport error.
    Fail(TransportError),
    /// Never answer (simulates a stalled connection).
    Hang,
}

impl Step {
    /// A JSON response with the given status.
    #[must_use]
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::Respond(HttpResponse::json(status, &body))
    }

    /// A bare status with an empty text body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::Respond(HttpResponse::text(status, ""))
    }

    /// A connection failure.
    #[must_use]
    pub fn refused() -> Self {
        Self::Fail(TransportError::Connect("connection refused".to_string()))
    }
}

/// One recorded call.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    /// The request as handed to the transport.
    pub request: HttpRequest,
    /// When the call started.
    pub at: Instant,
}

#[derive(Default)]
struct InternalState {
    script: VecDeque<Step>,
    repeat: Option<Step>,
    calls: Vec<RecordedCall>,
}

/// Transport that replays a script of steps.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<InternalState>>,
}

impl ScriptedTransport {
    /// Create a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that plays `steps` in order.
    #[must_use]
    pub fn with_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InternalState {
                script: steps.into_iter().collect(),
                ..InternalState::default()
            })),
        }
    }

    /// Create a transport that answers every call with `step`.
    #[must_use]
    pub fn repeating(step: Step) -> Self {
        Self {
            state: Arc::new(Mutex::new(InternalState {
                repeat: Some(step),
                ..InternalState::default()
            })),
        }
    }

    /// Append a step to the script.
    pub async fn push(&self, step: Step) {
        self.state.lock().await.script.push_back(step);
    }

    /// Step replayed once the script is exhausted.
    pub async fn repeat(&self, step: Step) {
        self.state.lock().await.repeat = Some(step);
    }

    /// Number of calls made so far.
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    /// Snapshot of recorded calls.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    /// Gaps between consecutive call start times.
    pub async fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls().await;
        calls
            .windows(2)
            .map(|w| w[1].at.duration_since(w[0].at))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "lumen-mock"
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let step = {
            let mut guard = self.state.lock().await;
            guard.calls.push(RecordedCall {
                request: request.clone(),
                at: Instant::now(),
            });
            guard.script.pop_front().or_else(|| guard.repeat.clone())
        };
        match step {
            Some(Step::Respond(r)) => Ok(r),
            Some(Step::RespondAfter(delay, r)) => {
                tokio::time::sleep(delay).await;
                Ok(r)
            }
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(TransportError::Io("script exhausted".to_string())),
        }
    }
}
