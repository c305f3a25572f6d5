//! Debounced fetch pipeline for a changing series query.
//!
//! Query changes pass through a [`DebounceGate`]; each stabilized query is
//! fetched and aggregated under its own child cancellation token. A newer
//! stabilized query cancels the fetch in flight, whose result is discarded,
//! so updates always describe the latest settled query.

use std::time::Duration;

use lumen_core::{
    AggregatedPoint, CancellationToken, DebounceGate, LumenError, ScheduledTask, SeriesQuery,
};
use tokio::sync::mpsc;

use crate::client::DataServiceClient;

/// Result of fetching one stabilized query.
#[derive(Debug, Clone)]
pub struct SeriesUpdate {
    /// The query the outcome answers.
    pub query: SeriesQuery,
    /// Aggregated series, or the error that ended the fetch.
    pub outcome: Result<Vec<AggregatedPoint>, LumenError>,
}

/// Handle to a running pipeline. Dropping it stops the pipeline.
#[derive(Debug)]
pub struct PipelineHandle {
    gate: ScheduledTask,
    driver: ScheduledTask,
}

impl PipelineHandle {
    /// Stop the gate and the fetch driver, cancelling any fetch in flight.
    pub fn stop(&self) {
        self.gate.stop();
        self.driver.stop();
    }

    /// `true` once both background tasks have exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.gate.is_finished() && self.driver.is_finished()
    }

    /// Wait for the pipeline to drain after its input closed.
    pub async fn join(self) {
        let Self { gate, driver } = self;
        gate.join().await;
        driver.join().await;
    }
}

/// Entry point for spawning series pipelines.
#[derive(Debug, Clone, Copy)]
pub struct SeriesPipeline;

enum Next {
    Stop,
    Superseded(SeriesQuery),
    Done(Result<Vec<AggregatedPoint>, LumenError>),
}

impl SeriesPipeline {
    /// Spawn a pipeline on the current runtime.
    ///
    /// The update stream closes once `changes` closes and the last stabilized
    /// query has been answered, or as soon as `shutdown` is cancelled.
    pub fn spawn(
        client: DataServiceClient,
        delay: Duration,
        changes: mpsc::Receiver<SeriesQuery>,
        shutdown: &CancellationToken,
    ) -> (PipelineHandle, mpsc::Receiver<SeriesUpdate>) {
        let (gate, stable) = DebounceGate::new(delay).spawn(changes, shutdown);
        let (tx, rx) = mpsc::channel(8);
        let driver =
            ScheduledTask::spawn(shutdown, move |stop| Self::drive(client, stable, tx, stop));
        (PipelineHandle { gate, driver }, rx)
    }

    async fn drive(
        client: DataServiceClient,
        mut stable: mpsc::Receiver<SeriesQuery>,
        out: mpsc::Sender<SeriesUpdate>,
        stop: CancellationToken,
    ) {
        let mut input_open = true;
        let mut current: Option<SeriesQuery> = None;

        loop {
            let Some(query) = current.take() else {
                if !input_open {
                    return;
                }
                tokio::select! {
                    biased;
                    () = stop.cancelled() => return,
                    next = stable.recv() => match next {
                        Some(q) => current = Some(q),
                        None => return,
                    },
                }
                continue;
            };

            let fetch_token = stop.child_token();
            let next = {
                let fetch = client.aggregated_series(&query, &fetch_token);
                tokio::pin!(fetch);
                loop {
                    tokio::select! {
                        biased;
                        () = stop.cancelled() => break Next::Stop,
                        q = stable.recv(), if input_open => match q {
                            Some(q) => break Next::Superseded(q),
                            None => input_open = false,
                        },
                        outcome = &mut fetch => break Next::Done(outcome),
                    }
                }
            };

            match next {
                Next::Stop => {
                    fetch_token.cancel();
                    return;
                }
                Next::Superseded(newer) => {
                    fetch_token.cancel();
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        target: "lumen::pipeline",
                        stale = query.sensor_id,
                        latest = newer.sensor_id,
                        "superseded in-flight fetch"
                    );
                    current = Some(newer);
                }
                Next::Done(outcome) => {
                    let update = SeriesUpdate { query, outcome };
                    tokio::select! {
                        biased;
                        () = stop.cancelled() => return,
                        sent = out.send(update) => if sent.is_err() {
                            return;
                        },
                    }
                }
            }
        }
    }
}
