//! Shared helpers for menudesk-session integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use futures::future::BoxFuture;
use menudesk_session::{
    ApiRequest, ApiResponse, CredentialStore, GatewayConfig, HttpTransport, Identity, Session,
    SessionState, TransportError,
};
use menudesk_storage::MemoryStore;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};

// --- tokens ---

/// Builds an unsigned `header.payload.signature` token expiring
/// `expires_in_secs` from now (negative = already expired).
pub fn make_token(subject: &str, expires_in_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + expires_in_secs;
    token_with_payload(&serde_json::json!({ "sub": subject, "exp": exp }).to_string())
}

pub fn token_with_payload(payload: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(payload.as_bytes());
    format!("{header}.{payload}.signature")
}

pub fn fresh_token(subject: &str) -> String {
    make_token(subject, 3600)
}

pub fn expired_token(subject: &str) -> String {
    make_token(subject, -3600)
}

// --- sessions ---

pub fn session(access: &str, refresh: &str) -> Session {
    Session {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        identity: Identity {
            name: "admin".to_string(),
            roles: ["ROLE_ADMIN".to_string()].into_iter().collect(),
        },
    }
}

pub fn auth_body(access: &str, refresh: &str) -> serde_json::Value {
    serde_json::json!({
        "accessToken": access,
        "refreshToken": refresh,
        "tokenType": "Bearer",
        "username": "admin",
        "roles": ["ROLE_ADMIN"]
    })
}

/// Fresh in-memory state plus a handle on its backing storage.
pub fn memory_state() -> (SessionState, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let state = SessionState::new(CredentialStore::new(storage.clone()));
    (state, storage)
}

pub fn test_config(base_url: &str) -> GatewayConfig {
    GatewayConfig {
        api_base_url: base_url.to_string(),
        request_timeout_ms: 2_000,
        refresh_timeout_ms: 1_000,
        report_errors: true,
    }
}

// --- scripted transport ---

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

type Reply = BoxFuture<'static, Result<ApiResponse, TransportError>>;
type Handler = dyn Fn(RecordedCall) -> Reply + Send + Sync;

/// In-process transport whose replies are produced by a closure, so tests
/// can control timing without a network.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(RecordedCall) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let call = RecordedCall {
            method: request.method.to_string(),
            path: request.path.clone(),
            bearer: bearer.map(str::to_string),
            body: request.body.clone(),
        };
        self.calls.lock().unwrap().push(call.clone());
        (self.handler)(call).await
    }
}

pub fn json_reply(
    status: StatusCode,
    body: serde_json::Value,
) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(status, body.to_string()))
}

pub fn status_reply(status: StatusCode) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(status, Vec::new()))
}
