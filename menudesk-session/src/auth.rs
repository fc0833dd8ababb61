//! Login and logout against the auth endpoints.
//!
//! These calls bypass the gateway: a 401 from `/auth/login` means bad
//! credentials, not an expired token, and must never trigger a refresh.

use crate::error::{GatewayError, GatewayResult};
use crate::lifecycle::SessionLifecycle;
use crate::transport::{ApiRequest, HttpTransport};
use crate::types::{AuthResponse, LoginRequest, LogoutReason, Session, SessionEvent};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Clone)]
pub struct AuthClient {
    transport: Arc<dyn HttpTransport>,
    lifecycle: SessionLifecycle,
    logout_timeout: Duration,
}

impl AuthClient {
    pub fn new(
        lifecycle: SessionLifecycle,
        transport: Arc<dyn HttpTransport>,
        logout_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            lifecycle,
            logout_timeout,
        }
    }

    /// Exchanges username and password for a session.
    pub async fn login(&self, username: &str, password: &str) -> GatewayResult<Session> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { username, password })?;
        let response = self.transport.send(&request, None).await?;

        match response.status {
            status if status.is_success() => {
                let auth: AuthResponse = response.json()?;
                let session = self.lifecycle.state().set_credentials(auth).await;
                info!(user = %session.identity.name, "logged in");
                self.lifecycle.notify(SessionEvent::LoggedIn {
                    name: session.identity.name.clone(),
                });
                Ok(session)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!(%username, "login rejected");
                Err(GatewayError::InvalidCredentials(response.text()))
            }
            status => Err(GatewayError::from_status(status, &response.body)),
        }
    }

    /// Ends the session locally, after telling the server on a best-effort
    /// basis. Returns whether a session was active.
    pub async fn logout(&self) -> bool {
        if let Some(token) = self.lifecycle.state().access_token().await {
            let request = ApiRequest::post(LOGOUT_PATH).timeout(self.logout_timeout);
            let call = self.transport.send(&request, Some(&token));
            match tokio::time::timeout(self.logout_timeout, call).await {
                Ok(Ok(response)) if response.is_success() => {
                    debug!("server-side logout acknowledged")
                }
                Ok(Ok(response)) => warn!(status = %response.status, "server-side logout rejected"),
                Ok(Err(e)) => warn!("server-side logout failed: {e}"),
                Err(_) => warn!("server-side logout timed out"),
            }
        }

        self.lifecycle.logout(LogoutReason::UserRequested).await
    }
}
