use std::sync::Arc;
use std::time::Duration;

use lumen::{
    BucketInterval, CacheStore, CancellationToken, Lumen, LumenConfig, LumenError,
    MemoryCacheStore, ReportRange, SeriesQuery, TimeWindow,
};
use lumen_mock::{ScriptedTransport, Step};
use serde_json::json;

#[test]
fn defaults_match_documented_configuration() {
    let lumen = Lumen::builder().build().unwrap();
    assert_eq!(lumen.config(), &LumenConfig::default());
    assert_eq!(lumen.config().debounce_delay, Duration::from_millis(250));
}

#[test]
fn modifiers_land_in_the_config() {
    let lumen = Lumen::builder()
        .base_url("http://10.0.0.5:3000")
        .timeout(Duration::from_secs(2))
        .retries(3)
        .retry_delay(Duration::from_millis(100))
        .series_cache_ttl(Duration::ZERO)
        .heatmap_cache_ttl(Duration::from_secs(5))
        .reports_cache_ttl(Duration::from_secs(120))
        .bucket_interval(BucketInterval::new(5).unwrap())
        .time_zone(chrono_tz::Europe::Madrid)
        .value_field("irradiance")
        .build()
        .unwrap();

    let cfg = lumen.config();
    assert_eq!(cfg.base_url, "http://10.0.0.5:3000");
    assert_eq!(cfg.request.timeout, Duration::from_secs(2));
    assert_eq!(cfg.request.retries, 3);
    assert_eq!(cfg.heatmap_cache_ttl, Duration::from_secs(5));
    assert_eq!(cfg.bucket_interval.minutes(), 5);
    assert_eq!(cfg.time_zone, chrono_tz::Europe::Madrid);
    assert_eq!(cfg.value_field, "irradiance");
}

#[test]
fn invalid_settings_are_rejected() {
    for builder in [
        Lumen::builder().base_url("not a url"),
        Lumen::builder().base_url("mailto:ops@example.com"),
        Lumen::builder().timeout(Duration::ZERO),
        Lumen::builder().value_field("  "),
    ] {
        assert!(matches!(builder.build(), Err(LumenError::InvalidArg(_))));
    }
}

#[tokio::test(start_paused = true)]
async fn clients_can_share_a_cache_store() {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let t = ScriptedTransport::with_steps([Step::json(
        200,
        json!([{ "key": "2024-05-01", "avg": 1, "max": 2, "min": 0 }]),
    )]);
    let build = || {
        Lumen::builder()
            .base_url("http://sensors.test")
            .transport(Arc::new(t.clone()))
            .cache(Arc::clone(&store))
            .build()
            .unwrap()
    };
    let (a, b) = (build(), build());
    let token = CancellationToken::new();

    a.client().reports(ReportRange::Day, &token).await.unwrap();
    let rows = b.client().reports(ReportRange::Day, &token).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(t.call_count().await, 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn shared_store_keeps_services_apart() {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let rows = |lux: f64| json!([{ "ts": "2024-05-01T09:00:00Z", "lux": lux }]);
    let ta = ScriptedTransport::with_steps([Step::json(200, rows(1.0))]);
    let tb = ScriptedTransport::with_steps([Step::json(200, rows(2.0))]);
    let build = |base: &str, t: &ScriptedTransport| {
        Lumen::builder()
            .base_url(base)
            .transport(Arc::new(t.clone()))
            .cache(Arc::clone(&store))
            .build()
            .unwrap()
    };
    let a = build("http://north.test", &ta);
    let b = build("http://south.test", &tb);
    let token = CancellationToken::new();
    let q = SeriesQuery::new(5, TimeWindow::All);

    let _ = a.client().series(&q, &token).await.unwrap();
    let from_b = b.client().series(&q, &token).await.unwrap();

    assert_eq!(tb.call_count().await, 1);
    assert_eq!(store.len().await, 2);
    assert_eq!(from_b[0].value, 2.0);
}
