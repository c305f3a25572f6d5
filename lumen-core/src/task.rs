use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A spawned background task owned by a handle.
///
/// The task receives a stop token; dropping the handle signals the token and
/// aborts the task if it has not finished, so timers and channels it owns are
/// released on every exit path.
#[derive(Debug)]
pub struct ScheduledTask {
    join: Option<JoinHandle<()>>,
    stop: CancellationToken,
}

impl ScheduledTask {
    /// Spawn `make(stop)` on the current runtime.
    ///
    /// The stop token handed to the task is a child of `parent`, so cancelling
    /// the parent also stops the task.
    pub fn spawn<F, Fut>(parent: &CancellationToken, make: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let stop = parent.child_token();
        let join = tokio::spawn(make(stop.clone()));
        Self {
            join: Some(join),
            stop,
        }
    }

    /// Ask the task to stop at its next suspension point.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Return `true` once the task has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the task to finish on its own.
    pub async fn join(mut self) {
        if let Some(h) = self.join.take() {
            let _ = h.await;
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.stop.cancel();
        if let Some(h) = self.join.take()
            && !h.is_finished()
        {
            h.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn drop_stops_the_task() {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
        let task = ScheduledTask::spawn(&CancellationToken::new(), |stop| async move {
            stop.cancelled().await;
            let _ = tx.send(()).await;
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        drop(task);
        // stopped cooperatively or aborted; either way the sender is gone
        let _ = rx.recv().await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn parent_cancellation_reaches_the_task() {
        let parent = CancellationToken::new();
        let task = ScheduledTask::spawn(&parent, |stop| async move { stop.cancelled().await });
        parent.cancel();
        task.join().await;
    }
}
