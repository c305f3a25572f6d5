//! Trailing-edge debounce for parameter changes.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use crate::task::ScheduledTask;

/// Delays propagation of a changing value until it has been quiet for `delay`.
///
/// Every incoming value replaces the pending one and restarts the timer; a
/// value is forwarded only after `delay` passes with no newer value. There is
/// no leading edge: the first value waits too. When the input closes, a
/// pending value is still forwarded once its quiet period elapses. Stopping
/// the gate drops any pending value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceGate {
    delay: Duration,
}

impl DebounceGate {
    /// Create a gate with the given quiescence delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Quiescence delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Run the gate on a background task, returning its handle and the stable output.
    pub fn spawn<T>(
        self,
        input: mpsc::Receiver<T>,
        parent: &CancellationToken,
    ) -> (ScheduledTask, mpsc::Receiver<T>)
    where
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let task = ScheduledTask::spawn(parent, move |stop| self.run(input, tx, stop));
        (task, rx)
    }

    /// Drive the gate until the input closes, the output is dropped or `stop` fires.
    pub async fn run<T>(
        self,
        mut input: mpsc::Receiver<T>,
        output: mpsc::Sender<T>,
        stop: CancellationToken,
    ) {
        let mut pending: Option<T> = None;
        let mut input_open = true;
        let timer = sleep(self.delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                biased;
                () = stop.cancelled() => break,
                next = input.recv(), if input_open => match next {
                    Some(value) => {
                        pending = Some(value);
                        timer.as_mut().reset(deadline_after(self.delay));
                    }
                    None => {
                        input_open = false;
                        if pending.is_none() {
                            break;
                        }
                    }
                },
                () = &mut timer, if pending.is_some() => {
                    if let Some(value) = pending.take() {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(target: "lumen::debounce", delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX), "propagating quiescent value");
                        if output.send(value).await.is_err() {
                            break;
                        }
                    }
                    if !input_open {
                        break;
                    }
                }
            }
        }
    }
}

// Delays past the clock's range park the timer at the horizon tokio itself
// uses for unrepresentable sleeps.
fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}
