use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lumen::{HttpResponse, ReqwestTransport, Transport};
use lumen_mock::{ScriptedTransport, Step};

/// Live HTTP transport, or a canned one when `LUMEN_DEMOS_USE_MOCK` is set.
#[must_use]
pub fn get_transport() -> Arc<dyn Transport> {
    if std::env::var("LUMEN_DEMOS_USE_MOCK").is_ok() {
        println!("--- (Using scripted transport) ---");
        let now = Utc::now();
        let rows: Vec<_> = (0..30i64)
            .map(|i| {
                serde_json::json!({
                    "ts": (now - chrono::Duration::minutes(i)).to_rfc3339(),
                    "lux": 300.0 + (i % 7) as f64 * 12.5,
                })
            })
            .collect();
        Arc::new(ScriptedTransport::repeating(Step::RespondAfter(
            Duration::from_millis(80),
            HttpResponse::json(200, &serde_json::Value::Array(rows)),
        )))
    } else {
        Arc::new(ReqwestTransport::new())
    }
}

/// Base URL from `LUMEN_BASE_URL`, defaulting to a local service.
#[must_use]
pub fn base_url() -> String {
    std::env::var("LUMEN_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}
