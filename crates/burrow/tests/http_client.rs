#![allow(clippy::unwrap_used, clippy::panic)]

//! HTTP client tests against the in-process local API fixture.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use burrow::http::types::{CapturedRequestsResponse, Proto, Tunnel, TunnelRequest, TunnelsResponse};
use burrow::http::{ApiClient, ApiError};
use common::FakeAgentApi;

#[tokio::test]
async fn create_list_delete_round_trip() {
    let api = FakeAgentApi::spawn();
    let client = ApiClient::new(&api.base_url()).unwrap();

    let request = TunnelRequest::new("my-tunnel", Proto::Http, "80");
    let created = client
        .post::<_, Tunnel>("/api/tunnels", &request, &[])
        .await
        .unwrap();
    assert_eq!(created.status, 201);
    assert_eq!(created.body.name, "my-tunnel");
    assert_eq!(created.body.proto, "http");
    assert_eq!(created.body.config.addr, "http://localhost:80");

    let listed = client
        .get::<TunnelsResponse>("/api/tunnels", &[])
        .await
        .unwrap();
    assert_eq!(listed.status, 200);
    assert_eq!(listed.body.tunnels.len(), 1);
    assert_eq!(listed.body.tunnels[0].name, "my-tunnel");

    let deleted = client.delete(&created.body.uri, &[]).await.unwrap();
    assert_eq!(deleted.status, 204);
    assert_eq!(deleted.body, Value::Null);

    let listed = client
        .get::<TunnelsResponse>("/api/tunnels", &[])
        .await
        .unwrap();
    assert!(listed.body.tunnels.is_empty());
}

#[tokio::test]
async fn query_filter_matches_exact_names_only() {
    let api = FakeAgentApi::spawn();
    let client = ApiClient::new(&api.base_url()).unwrap();

    let all = client
        .get::<CapturedRequestsResponse>("/api/requests/http", &[])
        .await
        .unwrap();
    assert_eq!(all.body.requests.len(), 2);

    // "tunnel (1)" survives percent-encoding and matches only itself, not
    // the "tunnel (1) (http)" prefix cousin.
    let filtered = client
        .get::<CapturedRequestsResponse>("/api/requests/http", &[("tunnel_name", "tunnel (1)")])
        .await
        .unwrap();
    assert_eq!(filtered.body.requests.len(), 1);
    assert_eq!(filtered.body.requests[0].tunnel_name, "tunnel (1)");

    let cousin = client
        .get::<CapturedRequestsResponse>(
            "/api/requests/http",
            &[("tunnel_name", "tunnel (1) (http)")],
        )
        .await
        .unwrap();
    assert_eq!(cousin.body.requests.len(), 1);
    assert_eq!(cousin.body.requests[0].tunnel_name, "tunnel (1) (http)");
}

#[tokio::test]
async fn error_statuses_are_typed() {
    let api = FakeAgentApi::spawn();
    let client = ApiClient::new(&api.base_url()).unwrap();

    let err = client
        .get::<Value>("/api/does-not-exist", &[])
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("not found"), "{body}");
        }
        other => panic!("expected status error, got {other:?}"),
    }

    let err = client
        .delete("/api/tunnels/never-created", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }), "{err:?}");
}

#[tokio::test]
async fn unreachable_service_is_a_connection_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(&format!("http://{addr}")).unwrap();
    let err = client.get::<Value>("/api/tunnels", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Connection(_)), "{err:?}");
}

#[tokio::test]
async fn request_hook_runs_before_send() {
    let api = FakeAgentApi::spawn();
    let hook_ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&hook_ran);

    let client = ApiClient::new(&api.base_url())
        .unwrap()
        .with_request_hook(Arc::new(move |builder| {
            flag.store(true, Ordering::SeqCst);
            builder.header("x-burrow-test", "1")
        }));

    let response = client.get::<Value>("/api/headers", &[]).await.unwrap();
    assert!(hook_ran.load(Ordering::SeqCst));
    assert_eq!(response.body["x-burrow-test"], "1");
}
