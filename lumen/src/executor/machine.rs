//! Per-call state machine of the request executor.
//!
//! The machine is a plain value: the executor feeds it an [`Event`] after each
//! suspension point and performs the returned [`Action`]. Keeping transitions
//! here, away from I/O, makes the retry policy testable without a runtime.

use std::time::Duration;

use lumen_core::is_retryable_status;

/// Where a call currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Created, no attempt made yet.
    Idle,
    /// Attempt `attempt` (1-based) is in flight.
    Pending {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// Waiting out the backoff before attempt `next_attempt`.
    Backoff {
        /// Attempt that follows the wait.
        next_attempt: u32,
    },
    /// Terminal: a 2xx response was delivered.
    Succeeded,
    /// Terminal: the call failed with a classified error.
    Failed,
    /// Terminal: the caller cancelled.
    Cancelled,
}

/// Something that happened at a suspension point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The caller started the call.
    Start,
    /// The in-flight attempt received a response.
    Response {
        /// HTTP status code.
        status: u16,
    },
    /// The in-flight attempt hit its deadline.
    TimedOut,
    /// The in-flight attempt failed below HTTP.
    TransportFailed {
        /// Whether the failure may clear on retry.
        transient: bool,
    },
    /// The backoff delay elapsed.
    BackoffElapsed,
    /// The caller's token fired.
    CancelRequested,
}

/// Why a call failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    /// Deadline exceeded on the final attempt.
    Timeout,
    /// Non-retryable status, or retryable status on the final attempt.
    Status(u16),
    /// Transport failure on the final attempt, or a non-transient one.
    Transport,
    /// Caller cancelled.
    Cancelled,
}

/// What the driver must do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Make attempt number `attempt`.
    Attempt {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// Sleep for `delay`, then report [`Event::BackoffElapsed`].
    Wait {
        /// How long to wait.
        delay: Duration,
        /// Attempt that follows the wait.
        next_attempt: u32,
    },
    /// Hand the successful response to the caller.
    Deliver,
    /// Surface the failure to the caller.
    Fail(Failure),
}

/// Retry policy plus the current phase of one call.
#[derive(Clone, Debug)]
pub struct CallMachine {
    phase: Phase,
    max_attempts: u32,
    retry_delay: Duration,
}

impl CallMachine {
    /// New machine allowing `max_attempts` attempts (at least one) with linear backoff.
    #[must_use]
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether the call has reached `Succeeded`, `Failed` or `Cancelled`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self.phase,
            Phase::Succeeded | Phase::Failed | Phase::Cancelled
        )
    }

    /// Backoff before the attempt following `attempt`: `retry_delay * attempt`.
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }

    /// Apply an event. Events that make no sense in the current phase (and
    /// every event after a terminal phase) leave the machine unchanged and
    /// produce no action.
    #[must_use]
    pub fn handle(self, event: Event) -> (Self, Option<Action>) {
        match (self.phase, event) {
            (Phase::Succeeded | Phase::Failed | Phase::Cancelled, _) => (self, None),
            (_, Event::CancelRequested) => (
                self.enter(Phase::Cancelled),
                Some(Action::Fail(Failure::Cancelled)),
            ),
            (Phase::Idle, Event::Start) => (
                self.enter(Phase::Pending { attempt: 1 }),
                Some(Action::Attempt { attempt: 1 }),
            ),
            (Phase::Pending { .. }, Event::Response { status }) if (200..300).contains(&status) => {
                (self.enter(Phase::Succeeded), Some(Action::Deliver))
            }
            (Phase::Pending { attempt }, Event::Response { status }) => {
                self.retry_or_fail(attempt, is_retryable_status(status), Failure::Status(status))
            }
            (Phase::Pending { attempt }, Event::TimedOut) => {
                self.retry_or_fail(attempt, true, Failure::Timeout)
            }
            (Phase::Pending { attempt }, Event::TransportFailed { transient }) => {
                self.retry_or_fail(attempt, transient, Failure::Transport)
            }
            (Phase::Backoff { next_attempt }, Event::BackoffElapsed) => (
                self.enter(Phase::Pending {
                    attempt: next_attempt,
                }),
                Some(Action::Attempt {
                    attempt: next_attempt,
                }),
            ),
            _ => (self, None),
        }
    }

    fn retry_or_fail(self, attempt: u32, retryable: bool, failure: Failure) -> (Self, Option<Action>) {
        if retryable && attempt < self.max_attempts {
            let delay = self.backoff_after(attempt);
            let next_attempt = attempt + 1;
            (
                self.enter(Phase::Backoff { next_attempt }),
                Some(Action::Wait {
                    delay,
                    next_attempt,
                }),
            )
        } else {
            (self.enter(Phase::Failed), Some(Action::Fail(failure)))
        }
    }

    const fn enter(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }
}
