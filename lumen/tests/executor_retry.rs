use std::sync::Arc;
use std::time::Duration;

use lumen::{
    HttpResponse, LumenError, Method, Payload, RequestConfig, RequestExecutor, TransportError,
};
use lumen_mock::{ScriptedTransport, Step};
use serde_json::json;

const URL: &str = "http://sensors.test/api/series?sensorId=1";

fn executor(t: &ScriptedTransport) -> RequestExecutor {
    RequestExecutor::with_transport(Arc::new(t.clone()))
}

fn assert_gap(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(10),
        "gap {actual:?}, expected ~{expected:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn retries_server_errors_with_linear_backoff() {
    let t = ScriptedTransport::with_steps([
        Step::status(500),
        Step::status(500),
        Step::json(200, json!([1, 2])),
    ]);
    let cfg = RequestConfig::new()
        .retries(2)
        .retry_delay(Duration::from_millis(350));

    let out = executor(&t).execute(URL, &cfg).await.unwrap();

    assert_eq!(out, Payload::Json(json!([1, 2])));
    assert_eq!(t.call_count().await, 3);
    let gaps = t.gaps().await;
    assert_gap(gaps[0], 350);
    assert_gap(gaps[1], 700);
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_not_retried_and_keep_the_body() {
    let t = ScriptedTransport::with_steps([Step::json(404, json!({ "error": "unknown sensor" }))]);
    let cfg = RequestConfig::new().retries(3);

    let err = executor(&t).execute(URL, &cfg).await.unwrap_err();

    match err {
        LumenError::Http { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, Some(json!({ "error": "unknown sensor" })));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(t.call_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn too_many_requests_is_retried() {
    let t = ScriptedTransport::with_steps([Step::status(429), Step::json(200, json!({}))]);

    let out = executor(&t).execute(URL, &RequestConfig::new()).await;

    assert!(out.is_ok());
    assert_eq!(t.call_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_last_status() {
    let t = ScriptedTransport::new();
    t.repeat(Step::status(503)).await;
    let cfg = RequestConfig::new()
        .retries(2)
        .retry_delay(Duration::from_millis(10));

    let err = executor(&t).execute(URL, &cfg).await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(matches!(err, LumenError::Http { body: None, .. }));
    assert_eq!(t.call_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn zero_retries_makes_a_single_attempt() {
    let t = ScriptedTransport::new();
    t.repeat(Step::status(500)).await;

    let err = executor(&t)
        .execute(URL, &RequestConfig::new().retries(0))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(t.call_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn connection_failures_are_retried() {
    let t = ScriptedTransport::with_steps([Step::refused(), Step::json(200, json!("ok"))]);

    let out = executor(&t).execute(URL, &RequestConfig::new()).await.unwrap();

    assert_eq!(out, Payload::Json(json!("ok")));
    assert_eq!(t.call_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn persistent_network_failure_surfaces_as_network_error() {
    let t = ScriptedTransport::new();
    t.repeat(Step::refused()).await;

    let err = executor(&t)
        .execute(URL, &RequestConfig::new().retries(1))
        .await
        .unwrap_err();

    assert!(matches!(err, LumenError::Network(TransportError::Connect(_))));
    assert_eq!(t.call_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_requests_are_not_retried() {
    let t = ScriptedTransport::with_steps([Step::Fail(TransportError::Request(
        "bad header".into(),
    ))]);

    let err = executor(&t)
        .execute(URL, &RequestConfig::new().retries(3))
        .await
        .unwrap_err();

    assert!(matches!(err, LumenError::Network(TransportError::Request(_))));
    assert_eq!(t.call_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn undecodable_json_is_a_decode_error() {
    let t = ScriptedTransport::with_steps([Step::Respond(HttpResponse {
        status: 200,
        content_type: Some("application/json".into()),
        body: b"{ not json".to_vec(),
    })]);

    let err = executor(&t)
        .execute(URL, &RequestConfig::new().retries(2))
        .await
        .unwrap_err();

    assert!(matches!(err, LumenError::Decode(_)));
    assert_eq!(t.call_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn non_json_bodies_are_returned_as_text() {
    let t = ScriptedTransport::with_steps([Step::Respond(HttpResponse::text(200, "pong"))]);

    let out = executor(&t).execute(URL, &RequestConfig::new()).await.unwrap();

    assert_eq!(out, Payload::Text("pong".into()));
}

#[tokio::test(start_paused = true)]
async fn method_headers_and_body_are_forwarded() {
    let t = ScriptedTransport::with_steps([Step::json(201, json!({ "ok": true, "id": 4 }))]);
    let cfg = RequestConfig::new()
        .method(Method::Post)
        .header("x-trace", "abc")
        .json_body(&json!({ "sensor_id": 2, "lux": 310.5 }))
        .unwrap();

    executor(&t)
        .execute("http://sensors.test/api/lecturas", &cfg)
        .await
        .unwrap();

    let calls = t.calls().await;
    let req = &calls[0].request;
    assert_eq!(req.method, Method::Post);
    assert_eq!(req.url, "http://sensors.test/api/lecturas");
    assert!(req.headers.contains(&("x-trace".into(), "abc".into())));
    let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({ "sensor_id": 2, "lux": 310.5 }));
}

#[tokio::test(start_paused = true)]
async fn typed_execution_reports_shape_mismatches_as_data_errors() {
    let t = ScriptedTransport::with_steps([Step::json(200, json!({ "ok": "yes" }))]);

    let err = executor(&t)
        .execute_json::<lumen::ReadingReceipt>(URL, &RequestConfig::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LumenError::Data(_)));
}
