mod support;

use std::time::Duration;

use hackportal::auth::{AuthError, CredentialStore};
use hackportal::error::PortalError;
use hackportal::http::RequestDescriptor;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{harness, pair};

async fn mount_refresh(server: &MockServer, response: ResponseTemplate, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(response)
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_teams(server: &MockServer, bearer: &str, status: u16, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/teams"))
        .and(header("authorization", bearer))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!([{ "id": 7 }])))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn attaches_bearer_credential_when_signed_in() {
    let server = MockServer::start().await;
    mount_teams(&server, "Bearer access-1", 200, 1).await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let response = h.client.send(RequestDescriptor::get("/teams")).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(h.client.coordinator().rounds_started(), 0);
}

#[tokio::test]
async fn sends_unauthenticated_request_when_signed_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, None);
    h.client.send(RequestDescriptor::get("/events")).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn expired_credential_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;
    mount_teams(&server, "Bearer access-1", 401, 1).await;
    mount_teams(&server, "Bearer T2", 200, 1).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "T2" })),
        1,
    )
    .await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let teams: serde_json::Value = h.client.get_json("/teams").await.unwrap();

    assert_eq!(teams, json!([{ "id": 7 }]));
    // Refresh credential was not rotated, so the old one is kept.
    assert_eq!(h.store.load().unwrap(), Some(pair("T2", "refresh-1")));
    assert_eq!(h.invalidator.calls(), 0);
}

#[tokio::test]
async fn concurrent_failures_share_a_single_refresh() {
    let server = MockServer::start().await;
    mount_teams(&server, "Bearer access-1", 401, 3).await;
    mount_teams(&server, "Bearer new", 200, 3).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({ "accessToken": "new", "refreshToken": "refresh-2" }))
            .set_delay(Duration::from_millis(200)),
        1,
    )
    .await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let calls = (0..3).map(|_| {
        let client = h.client.clone();
        async move { client.send(RequestDescriptor::get("/teams")).await }
    });
    let results = futures::future::join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap().status().as_u16(), 200);
    }
    assert_eq!(h.store.load().unwrap(), Some(pair("new", "refresh-2")));
    assert_eq!(h.client.coordinator().rounds_started(), 1);
    assert_eq!(h.client.coordinator().pending_waiters(), 0);
    assert_eq!(h.invalidator.calls(), 0);
}

#[tokio::test]
async fn rejected_refresh_fails_every_waiter_and_ends_session() {
    let server = MockServer::start().await;
    mount_teams(&server, "Bearer access-1", 401, 3).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(403).set_delay(Duration::from_millis(500)),
        1,
    )
    .await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let calls = (0..3).map(|_| {
        let client = h.client.clone();
        async move { client.send(RequestDescriptor::get("/teams")).await }
    });
    let results = futures::future::join_all(calls).await;

    for result in results {
        assert!(matches!(
            result,
            Err(PortalError::Authentication(AuthError::RefreshRejected { status: 403 }))
        ));
    }
    assert_eq!(h.invalidator.calls(), 1);
    assert_eq!(h.store.load().unwrap(), None);
    assert!(!h.client.coordinator().is_refreshing());
}

#[tokio::test]
async fn request_is_replayed_at_most_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scores"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "T2" })),
        1,
    )
    .await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let result = h.client.send(RequestDescriptor::get("/scores")).await;

    assert!(matches!(result, Err(PortalError::RetryExhausted { status: 401 })));
    assert_eq!(h.client.coordinator().rounds_started(), 1);
    assert_eq!(h.invalidator.calls(), 0);
}

#[tokio::test]
async fn unauthorized_login_never_triggers_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad password"))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let result = h
        .client
        .send(RequestDescriptor::post("/auth/login").with_body(json!({})))
        .await;

    match result {
        Err(PortalError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "bad password");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(h.client.coordinator().rounds_started(), 0);
    assert_eq!(h.invalidator.calls(), 0);
}

#[tokio::test]
async fn unauthorized_refresh_endpoint_call_never_recurses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let result = h
        .client
        .send(RequestDescriptor::post("/auth/refresh?source=manual"))
        .await;

    assert!(matches!(result, Err(PortalError::Api { status: 401, .. })));
    assert_eq!(h.client.coordinator().rounds_started(), 0);
}

#[tokio::test]
async fn unrooted_refresh_path_is_still_exempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let result = h.client.send(RequestDescriptor::post("auth/refresh")).await;

    assert!(matches!(result, Err(PortalError::Api { status: 401, .. })));
    assert_eq!(h.client.coordinator().rounds_started(), 0);
    assert_eq!(h.invalidator.calls(), 0);
    assert_eq!(h.store.load().unwrap(), Some(pair("access-1", "refresh-1")));
}

#[tokio::test]
async fn missing_refresh_credential_invalidates_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/appeals"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let h = harness(&server, None);
    let result = h.client.send(RequestDescriptor::get("/appeals")).await;

    assert!(matches!(
        result,
        Err(PortalError::Authentication(AuthError::RefreshCredentialMissing))
    ));
    assert_eq!(h.invalidator.calls(), 1);
    assert_eq!(h.client.coordinator().pending_waiters(), 0);
}

#[tokio::test]
async fn other_failures_propagate_without_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let err = h
        .client
        .send(RequestDescriptor::get("/teams"))
        .await
        .unwrap_err();

    assert!(matches!(err, PortalError::Api { status: 503, .. }));
    assert!(err.is_retryable());
    assert_eq!(h.store.load().unwrap(), Some(pair("access-1", "refresh-1")));
}

#[tokio::test]
async fn malformed_refresh_response_ends_session() {
    let server = MockServer::start().await;
    mount_teams(&server, "Bearer access-1", 401, 1).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "refreshToken": "refresh-2" })),
        1,
    )
    .await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let result = h.client.send(RequestDescriptor::get("/teams")).await;

    assert!(matches!(
        result,
        Err(PortalError::Authentication(AuthError::InvalidResponse(_)))
    ));
    assert_eq!(h.invalidator.calls(), 1);
    assert_eq!(h.store.load().unwrap(), None);
}

#[tokio::test]
async fn replay_keeps_method_query_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/appeals"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/appeals"))
        .and(header("authorization", "Bearer T2"))
        .and(wiremock::matchers::query_param("round", "2"))
        .and(body_json(json!({ "reason": "judge absent" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 11 })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "T2" })),
        1,
    )
    .await;

    let h = harness(&server, Some(pair("access-1", "refresh-1")));
    let request = RequestDescriptor::post("/appeals")
        .with_query("round", "2")
        .with_body(json!({ "reason": "judge absent" }));
    let response = h.client.send(request).await.unwrap();

    assert_eq!(response.status().as_u16(), 201);
}
