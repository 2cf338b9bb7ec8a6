//! Integration tests for the PeopleOS API client

use futures::future::join_all;
use peopleos_core::{CoreError, CoreResult, FileTokenStore, MemoryTokenStore, TokenStore};
use peopleos_http::client::error::{ClientError, RefreshError, SessionEndReason};
use peopleos_http::client::navigation::RecordingNavigator;
use peopleos_http::types::{LeaveDecision, LeaveStatus, Role};
use peopleos_http::{ApiClient, ApiRequest};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with(
    server: &MockServer,
    token: Option<&str>,
) -> (ApiClient, Arc<MemoryTokenStore>, RecordingNavigator) {
    let store = Arc::new(match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    });
    let navigator = RecordingNavigator::new();
    let client = ApiClient::builder()
        .base_url(server.uri())
        .token_store(store.clone())
        .navigator(Arc::new(navigator.clone()))
        .build()
        .unwrap();
    (client, store, navigator)
}

async fn calls_to(server: &MockServer, endpoint: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == endpoint)
        .collect()
}

fn bearer(request: &wiremock::Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "role": "hr"
        })))
        .mount(&mock_server)
        .await;

    let (client, _store, navigator) = client_with(&mock_server, Some("T1"));

    let user = client.me().await.unwrap();
    assert_eq!(user.role, Role::Hr);
    assert_eq!(user.email, "ada@example.com");
    assert!(navigator.targets().is_empty());
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&mock_server)
        .await;

    let (client, _store, _navigator) = client_with(&mock_server, None);

    let body: Value = client.get("/health").await.unwrap();
    assert_eq!(body["status"], "ok");

    let calls = calls_to(&mock_server, "/health").await;
    assert_eq!(calls.len(), 1);
    assert!(bearer(&calls[0]).is_none());
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hr/employees"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Token expired"})))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hr/employees"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "T2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, store, navigator) = client_with(&mock_server, Some("T1"));

    let results = join_all((0..5).map(|_| client.list_employees(Role::Hr))).await;
    for result in results {
        assert!(result.unwrap().is_empty());
    }

    assert_eq!(calls_to(&mock_server, "/auth/refresh").await.len(), 1);
    assert_eq!(store.get().as_deref(), Some("T2"));
    assert!(navigator.targets().is_empty());

    let replays: Vec<_> = calls_to(&mock_server, "/hr/employees")
        .await
        .iter()
        .filter_map(bearer)
        .filter(|value| value == "Bearer T2")
        .collect();
    assert_eq!(replays.len(), 5);

    let status = client.refresh_status().await.unwrap();
    assert!(!status.in_progress);
    assert_eq!(status.completed, 1);
}

#[tokio::test]
async fn test_refresh_failure_ends_session_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/employee/leave-requests"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "Refresh token expired"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, store, navigator) = client_with(&mock_server, Some("T1"));

    let results = join_all((0..4).map(|_| client.leave_requests(Role::Employee))).await;

    let mut terminated = 0;
    for result in results {
        match result {
            Err(ClientError::SessionTerminated(end)) => {
                terminated += 1;
                assert_eq!(end.redirect, "/login");
                assert!(matches!(end.reason, SessionEndReason::RefreshFailed(_)));
            }
            Err(ClientError::RefreshFailed(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    assert_eq!(terminated, 1);
    assert!(store.get().is_none());
    assert!(!client.is_authenticated());
    assert_eq!(navigator.targets(), vec!["/login"]);
    assert_eq!(calls_to(&mock_server, "/auth/refresh").await.len(), 1);
}

#[tokio::test]
async fn test_retried_401_is_not_refreshed_again() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/departments"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Token revoked"})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "T2"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, store, navigator) = client_with(&mock_server, Some("T1"));

    let err = client.list_departments(Role::Admin).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(ref message) if message == "Token revoked"));
    assert_eq!(store.get().as_deref(), Some("T2"));
    assert!(navigator.targets().is_empty());
    assert_eq!(calls_to(&mock_server, "/admin/departments").await.len(), 2);
}

#[tokio::test]
async fn test_forbidden_redirects_to_login_with_reason() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/attendance/me"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"error": "Account suspended"})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "T2"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (client, store, navigator) = client_with(&mock_server, Some("T1"));

    let err = client.attendance_history().await.unwrap_err();
    assert!(err.is_session_terminated());
    assert_eq!(err.redirect(), Some("/login?error=Account%20suspended"));
    match err {
        ClientError::SessionTerminated(end) => assert_eq!(
            end.reason,
            SessionEndReason::Forbidden(Some("Account suspended".to_string()))
        ),
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(store.get().is_none());
    assert_eq!(
        navigator.targets(),
        vec!["/login?error=Account%20suspended"]
    );
}

#[tokio::test]
async fn test_server_error_propagates_unchanged() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/attendance/check-in"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&mock_server)
        .await;

    let (client, store, navigator) = client_with(&mock_server, Some("T1"));

    let err = client.check_in().await.unwrap_err();
    match err {
        ClientError::ServerError { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.get().as_deref(), Some("T1"));
    assert!(navigator.targets().is_empty());
}

#[tokio::test]
async fn test_login_stores_token_and_logout_clears_it() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "ada@example.com", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "T1",
            "user": {
                "id": "u1",
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "role": "super-admin",
                "tenantId": "acme"
            }
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, store, _navigator) = client_with(&mock_server, None);

    let response = client.login("ada@example.com", "hunter2").await.unwrap();
    let user = response.user.unwrap();
    assert_eq!(user.role, Role::SuperAdmin);
    assert_eq!(user.tenant_id.as_deref(), Some("acme"));
    assert_eq!(store.get().as_deref(), Some("T1"));
    assert!(client.is_authenticated());

    client.logout().await.unwrap();
    assert!(store.get().is_none());
}

#[tokio::test]
async fn test_login_rejection_does_not_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "T2"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (client, store, navigator) = client_with(&mock_server, None);

    let err = client.login("ada@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(ref message) if message == "Invalid credentials"));
    assert!(store.get().is_none());
    assert!(navigator.targets().is_empty());
}

#[tokio::test]
async fn test_logout_clears_token_even_when_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let (client, store, _navigator) = client_with(&mock_server, Some("T1"));

    let err = client.logout().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(store.get().is_none());
}

#[tokio::test]
async fn test_refresh_session_persists_to_file_store() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "T2"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("session.json");
    let store = Arc::new(FileTokenStore::open(&file, "token").unwrap());
    store.set("T1").unwrap();

    let client = ApiClient::builder()
        .base_url(mock_server.uri())
        .token_store(store)
        .build()
        .unwrap();

    assert_eq!(client.refresh_session().await.unwrap(), "T2");

    let reopened = FileTokenStore::open(&file, "token").unwrap();
    assert_eq!(reopened.get().as_deref(), Some("T2"));
}

#[tokio::test]
async fn test_wrapped_listing_and_leave_review() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/manager/employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "e1",
                "firstName": "Grace",
                "lastName": "Hopper",
                "email": "grace@example.com",
                "status": "on-leave"
            }]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/manager/leave-requests/l1"))
        .and(body_json(json!({"status": "approved"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "l1",
            "employeeId": "e1",
            "leaveType": "annual",
            "startDate": "2026-03-02",
            "endDate": "2026-03-04",
            "status": "approved"
        })))
        .mount(&mock_server)
        .await;

    let (client, _store, _navigator) = client_with(&mock_server, Some("T1"));

    let employees = client.list_employees(Role::Manager).await.unwrap();
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0].full_name(), "Grace Hopper");

    let reviewed = client
        .review_leave(Role::Manager, "l1", LeaveDecision::Approve)
        .await
        .unwrap();
    assert_eq!(reviewed.status, LeaveStatus::Approved);
    assert_eq!(reviewed.days(), 3);
}

#[tokio::test]
async fn test_raw_request_with_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hr/attendance"))
        .and(wiremock::matchers::query_param("date", "2026-03-02"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (client, _store, _navigator) = client_with(&mock_server, Some("T1"));

    let response = client
        .send(ApiRequest::get("hr/attendance").query("date", "2026-03-02"))
        .await
        .unwrap();
    assert!(response.is_success());
    let records: Vec<Value> = response.json().unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_forbidden_during_refresh_keeps_session_ended() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/employee/attendance"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/employee/attendance"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"error": "Account suspended"})),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "T2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, store, navigator) = client_with(&mock_server, Some("T1"));

    let attendance = {
        let client = client.clone();
        tokio::spawn(async move { client.team_attendance(Role::Employee).await })
    };
    // Let the 401 start the refresh before the 403 lands
    tokio::time::sleep(Duration::from_millis(100)).await;

    let forbidden = client.me().await.unwrap_err();
    assert_eq!(forbidden.redirect(), Some("/login?error=Account%20suspended"));

    let err = attendance.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        ClientError::RefreshFailed(RefreshError::SessionEnded)
    ));

    assert!(store.get().is_none());
    assert!(!client.is_authenticated());
    assert_eq!(
        navigator.targets(),
        vec!["/login?error=Account%20suspended"]
    );

    let replays: Vec<_> = calls_to(&mock_server, "/employee/attendance")
        .await
        .iter()
        .filter_map(bearer)
        .filter(|value| value == "Bearer T2")
        .collect();
    assert!(replays.is_empty());
}

#[tokio::test]
async fn test_forbidden_login_redirects_with_reason() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"error": "Account suspended"})),
        )
        .mount(&mock_server)
        .await;

    let (client, store, navigator) = client_with(&mock_server, None);

    let err = client.login("ada@example.com", "hunter2").await.unwrap_err();
    assert!(err.is_session_terminated());
    assert_eq!(err.redirect(), Some("/login?error=Account%20suspended"));
    assert!(store.get().is_none());
    assert_eq!(
        navigator.targets(),
        vec!["/login?error=Account%20suspended"]
    );
}

/// Holds a token but cannot delete it
#[derive(Debug)]
struct ReadOnlyStore;

impl TokenStore for ReadOnlyStore {
    fn get(&self) -> Option<String> {
        Some("T1".to_string())
    }

    fn set(&self, _token: &str) -> CoreResult<()> {
        Err(CoreError::io_error("session file is read-only"))
    }

    fn clear(&self) -> CoreResult<()> {
        Err(CoreError::io_error("session file is read-only"))
    }
}

#[tokio::test]
async fn test_logout_reports_backend_error_when_clear_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let client = ApiClient::builder()
        .base_url(mock_server.uri())
        .token_store(Arc::new(ReadOnlyStore))
        .build()
        .unwrap();

    let err = client.logout().await.unwrap_err();
    match err {
        ClientError::ServerError { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
