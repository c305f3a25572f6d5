use std::time::Duration;

use lumen_core::{HttpRequest, Method, Transport, TransportError};
use lumen_mock::{ScriptedTransport, Step};

fn get(url: &str) -> HttpRequest {
    HttpRequest {
        method: Method::Get,
        url: url.to_string(),
        headers: vec![],
        body: None,
    }
}

#[tokio::test]
async fn plays_steps_in_order_then_reports_exhaustion() {
    let t = ScriptedTransport::with_steps([Step::status(500), Step::refused()]);

    assert_eq!(t.send(&get("http://x/1")).await.unwrap().status, 500);
    assert!(matches!(
        t.send(&get("http://x/2")).await,
        Err(TransportError::Connect(_))
    ));
    assert!(matches!(
        t.send(&get("http://x/3")).await,
        Err(TransportError::Io(_))
    ));

    let calls = t.calls().await;
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].request.url, "http://x/2");
}

#[tokio::test]
async fn repeat_step_serves_after_script() {
    let t = ScriptedTransport::new();
    t.repeat(Step::status(204)).await;
    for _ in 0..3 {
        assert_eq!(t.send(&get("http://x")).await.unwrap().status, 204);
    }
    assert_eq!(t.call_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn hang_never_resolves() {
    let t = ScriptedTransport::with_steps([Step::Hang]);
    let res = tokio::time::timeout(Duration::from_secs(60), t.send(&get("http://x"))).await;
    assert!(res.is_err());
}

#[tokio::test(start_paused = true)]
async fn repeating_transport_delays_every_answer() {
    let t = ScriptedTransport::repeating(Step::RespondAfter(
        Duration::from_millis(80),
        lumen_core::HttpResponse::text(200, "ok"),
    ));
    let start = tokio::time::Instant::now();
    for _ in 0..2 {
        assert_eq!(t.send(&get("http://x")).await.unwrap().status, 200);
    }
    assert!(start.elapsed() >= Duration::from_millis(160));
    assert_eq!(t.gaps().await.len(), 1);
}
