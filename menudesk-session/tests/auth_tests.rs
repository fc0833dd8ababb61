mod support;

use menudesk_session::credential_store::{ACCESS_TOKEN_KEY, IDENTITY_KEY};
use menudesk_session::{GatewayError, LogoutReason, MenudeskClient, SessionEvent};
use menudesk_storage::{KeyValueStore, MemoryStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use support::{auth_body, fresh_token, session, test_config};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn setup(server: &MockServer) -> (MenudeskClient, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let client = MenudeskClient::new(test_config(&server.uri()), storage.clone()).unwrap();
    (client, storage)
}

// --- Login ---

#[tokio::test]
async fn login_success_establishes_session() {
    let server = MockServer::start().await;
    let token = fresh_token("admin");
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(serde_json::json!({ "username": "admin", "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body(&token, "rt-1")))
        .expect(1)
        .mount(&server)
        .await;

    let (client, storage) = setup(&server);
    let mut events = client.subscribe();
    let session = client.login("admin", "secret").await.unwrap();

    assert_eq!(session.access_token, token);
    assert_eq!(session.refresh_token, "rt-1");
    assert!(client.is_authenticated().await);

    let identity = client.identity().await.unwrap();
    assert_eq!(identity.name, "admin");
    assert!(identity.has_role("ROLE_ADMIN"));

    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), Some(token));
    assert!(storage.get(IDENTITY_KEY).unwrap().is_some());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::LoggedIn {
            name: "admin".into()
        }
    );
}

#[tokio::test]
async fn login_sends_no_bearer_even_when_logged_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_body("at-2", "rt-2")))
        .mount(&server)
        .await;

    let (client, _) = setup(&server);
    client.state().set_session(session("at-1", "rt-1")).await;
    client.login("admin", "secret").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(client.state().access_token().await.as_deref(), Some("at-2"));
}

#[tokio::test]
async fn login_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, storage) = setup(&server);
    let err = client.login("admin", "wrong").await.unwrap_err();

    match err {
        GatewayError::InvalidCredentials(msg) => assert_eq!(msg, "Bad credentials"),
        other => panic!("expected InvalidCredentials, got {other:?}"),
    }
    assert!(!client.is_authenticated().await);
    assert!(storage.is_empty());
}

#[tokio::test]
async fn login_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (client, _) = setup(&server);
    let err = client.login("admin", "secret").await.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::SERVICE_UNAVAILABLE));
}

#[tokio::test]
async fn login_with_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let (client, _) = setup(&server);
    let err = client.login("admin", "secret").await.unwrap_err();
    assert!(matches!(err, GatewayError::Serialization(_)));
    assert!(!client.is_authenticated().await);
}

// --- Logout ---

#[tokio::test]
async fn logout_notifies_server_and_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer at-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, storage) = setup(&server);
    client.state().set_session(session("at-1", "rt-1")).await;
    let mut events = client.subscribe();

    assert!(client.logout().await);
    assert!(!client.is_authenticated().await);
    assert!(storage.is_empty());
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::LoggedOut {
            reason: LogoutReason::UserRequested,
            ..
        })
    ));
}

#[tokio::test]
async fn logout_completes_when_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (client, _) = setup(&server);
    client.state().set_session(session("at-1", "rt-1")).await;

    assert!(client.logout().await);
    assert_eq!(client.state().current().await, None);
}

#[tokio::test]
async fn logout_does_not_wait_on_slow_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let (client, _) = setup(&server);
    client.state().set_session(session("at-1", "rt-1")).await;

    let started = std::time::Instant::now();
    assert!(client.logout().await);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(client.state().current().await, None);
}

#[tokio::test]
async fn logout_when_logged_out_skips_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = setup(&server);
    assert!(!client.logout().await);
}

#[tokio::test]
async fn logout_twice_is_harmless() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = setup(&server);
    client.state().set_session(session("at-1", "rt-1")).await;

    assert!(client.logout().await);
    assert!(!client.logout().await);
}
