//! Session-aware request gateway for the menudesk client.
//!
//! Every business call goes through [`RequestGateway`], which:
//! - attaches the current access token as a bearer credential
//! - detects expiry (HTTP 401) and asks [`ReauthCoordinator`] for a new token
//! - retries the original call exactly once with the refreshed token
//! - cascades a logout through [`SessionLifecycle`] when refresh is impossible
//!
//! Refresh is single-flight: any number of concurrent 401s share one refresh
//! call. Session state is an injected [`SessionState`] mirrored to a
//! [`menudesk_storage::KeyValueStore`] by [`CredentialStore`].

pub mod auth;
pub mod client;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod logging;
pub mod reauth;
pub mod session_state;
pub mod token;
pub mod transport;
pub mod types;

pub use auth::AuthClient;
pub use client::MenudeskClient;
pub use config::GatewayConfig;
pub use credential_store::CredentialStore;
pub use error::{AuthFailure, GatewayError, GatewayResult, TransportError};
pub use gateway::RequestGateway;
pub use lifecycle::SessionLifecycle;
pub use reauth::ReauthCoordinator;
pub use session_state::SessionState;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
pub use types::*;
