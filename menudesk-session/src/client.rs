//! Ready-to-use client wiring the session components together.

use crate::auth::AuthClient;
use crate::config::GatewayConfig;
use crate::credential_store::CredentialStore;
use crate::error::GatewayResult;
use crate::gateway::RequestGateway;
use crate::lifecycle::SessionLifecycle;
use crate::reauth::ReauthCoordinator;
use crate::session_state::SessionState;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{Identity, Session, SessionEvent};
use menudesk_storage::KeyValueStore;
use std::sync::Arc;
use tokio::sync::broadcast;

/// One logical user session against the menudesk API.
///
/// Independent instances share nothing, so tests (or multi-account tools)
/// can run several side by side.
pub struct MenudeskClient {
    config: GatewayConfig,
    lifecycle: SessionLifecycle,
    gateway: RequestGateway,
    auth: AuthClient,
}

impl MenudeskClient {
    /// Builds a client over reqwest and restores any valid persisted session.
    pub fn new(config: GatewayConfig, storage: Arc<dyn KeyValueStore>) -> GatewayResult<Self> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(config, storage, transport))
    }

    pub fn with_transport(
        config: GatewayConfig,
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let state = SessionState::restore(CredentialStore::new(storage));
        let lifecycle = SessionLifecycle::new(state);
        let coordinator = ReauthCoordinator::new(
            lifecycle.clone(),
            transport.clone(),
            config.refresh_timeout(),
        );
        let gateway = RequestGateway::new(lifecycle.clone(), coordinator, transport.clone())
            .with_error_reporting(config.report_errors);
        let auth = AuthClient::new(lifecycle.clone(), transport, config.request_timeout());

        Self {
            config,
            lifecycle,
            gateway,
            auth,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> GatewayResult<Session> {
        self.auth.login(username, password).await
    }

    pub async fn logout(&self) -> bool {
        self.auth.logout().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.lifecycle.state().is_authenticated().await
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.lifecycle.state().identity().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.lifecycle.subscribe()
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn coordinator(&self) -> &ReauthCoordinator {
        self.gateway.coordinator()
    }

    pub fn state(&self) -> &SessionState {
        self.lifecycle.state()
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
