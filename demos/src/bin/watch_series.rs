use std::time::Duration;

use lumen::{CancellationToken, Lumen, SeriesQuery, TimeWindow};
use lumen_demos::common::{base_url, get_transport};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,lumen=debug
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();

    let sensor_id: u32 = std::env::args()
        .nth(1)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(1);

    let lumen = Lumen::builder()
        .base_url(base_url())
        .transport(get_transport())
        .build()?;

    let shutdown = CancellationToken::new();
    let (tx, rx) = mpsc::channel(8);
    let (handle, mut updates) = lumen.watch_series(rx, &shutdown);

    // Flip through the presets faster than the debounce delay, then settle on each.
    let feeder = tokio::spawn(async move {
        for window in TimeWindow::PRESETS {
            if tx.send(SeriesQuery::new(sensor_id, window)).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        for window in TimeWindow::PRESETS {
            if tx.send(SeriesQuery::new(sensor_id, window)).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                shutdown.cancel();
                break;
            }
            update = updates.recv() => {
                let Some(update) = update else { break };
                match update.outcome {
                    Ok(points) => {
                        println!(
                            "sensor {} {:?}: {} buckets",
                            update.query.sensor_id,
                            update.query.window,
                            points.len()
                        );
                        for p in points.iter().rev().take(3) {
                            println!("  {}  {:>8.2} lux  (n={})", p.bucket_start, p.value, p.count);
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "series update failed"),
                }
            }
        }
    }

    feeder.abort();
    handle.join().await;
    Ok(())
}
