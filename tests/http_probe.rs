mod common;

use std::time::Duration;

use axum::extract::RawQuery;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use liveness_poller::core::{HttpWorker, Probe, Supervisor, Target, Worker};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn app() -> Router {
    Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route(
            "/down",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        )
        .route(
            "/echo",
            get(|RawQuery(query): RawQuery| async move { query.unwrap_or_default() }),
        )
}

#[tokio::test]
async fn status_200_captures_body() {
    let addr = common::serve(app()).await;
    let target = Target::new(format!("http://{addr}/ok"));
    let probe = HttpWorker::default().probe_for(&target).unwrap();

    let result = probe.probe(&target).await;
    assert_eq!(result.url, target.identity);
    assert_eq!(result.status, 200);
    assert_eq!(result.body, "ok");
    assert_eq!(result.message, "");
}

#[tokio::test]
async fn non_200_reports_status_line_without_body() {
    let addr = common::serve(app()).await;
    let target = Target::new(format!("http://{addr}/down"));
    let probe = HttpWorker::default().probe_for(&target).unwrap();

    let result = probe.probe(&target).await;
    assert_eq!(result.status, 503);
    assert_eq!(result.body, "");
    assert_eq!(result.message, "503 Service Unavailable");
}

#[tokio::test]
async fn param_reaches_the_server_verbatim() {
    let addr = common::serve(app()).await;
    let target = Target::new(format!("http://{addr}/echo?z=1")).with_param("&w=2");
    let probe = HttpWorker::default().probe_for(&target).unwrap();

    let result = probe.probe(&target).await;
    assert_eq!(result.status, 200);
    assert_eq!(result.body, "z=1&w=2");
    // The result names the configured target, not the augmented request.
    assert_eq!(result.url, format!("http://{addr}/echo?z=1"));
}

/// Answers one request with a 200 whose body stops short of its
/// Content-Length, then hangs up.
async fn truncated_peer() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
            .await;
        let _ = socket.shutdown().await;
    });
    addr
}

#[tokio::test]
async fn status_200_with_unreadable_body_reports_the_read_error() {
    let addr = truncated_peer().await;
    let target = Target::new(format!("http://{addr}/health"));
    let probe = HttpWorker::new(Duration::from_secs(1), Duration::from_secs(5))
        .probe_for(&target)
        .unwrap();

    let result = probe.probe(&target).await;
    assert_eq!(result.url, target.identity);
    assert_eq!(result.status, 200);
    assert_eq!(result.body, "");
    assert!(!result.message.is_empty());
}

#[tokio::test]
async fn unreachable_target_fails_the_same_way_every_time() {
    let addr = common::closed_addr();
    let target = Target::new(format!("http://{addr}/health"));
    let probe = HttpWorker::new(Duration::from_secs(1), Duration::from_secs(5))
        .probe_for(&target)
        .unwrap();

    for _ in 0..3 {
        let result = probe.probe(&target).await;
        assert_eq!(result.url, target.identity);
        assert_eq!(result.status, 0);
        assert_eq!(result.body, "");
        assert!(!result.message.is_empty());
    }
}

#[tokio::test]
async fn rounds_cover_every_url() {
    let addr = common::serve(app()).await;
    let targets = vec![
        Target::new(format!("http://{addr}/ok")),
        Target::new(format!("http://{addr}/down")),
        Target::new(format!("http://{addr}/echo?z=1")).with_param("&w=2"),
    ];
    let identities: Vec<String> = targets.iter().map(|t| t.identity.clone()).collect();
    let worker = HttpWorker::new(Duration::from_secs(1), Duration::from_millis(40));
    let supervisor = Supervisor::new(worker, targets, Vec::new())
        .unwrap()
        .poll_interval(Duration::from_millis(20));
    let state = supervisor.state();
    let handle = tokio::spawn(supervisor.boot());

    tokio::time::sleep(Duration::from_millis(200)).await;
    state.stop();
    let rounds = common::rounds(handle.await.unwrap().unwrap());

    assert!(!rounds.is_empty());
    for round in &rounds {
        assert_eq!(round.len(), 3);
        for result in round {
            let url = result["url"].as_str().unwrap();
            assert!(identities.iter().any(|i| i == url));
            let status = result["status"].as_u64().unwrap();
            match status {
                200 => assert_eq!(result["message"], ""),
                503 => assert_eq!(result["body"], ""),
                other => panic!("unexpected status {other}"),
            }
        }
    }
}
