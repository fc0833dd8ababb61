//! Session-aware request gateway.
//!
//! Each call walks attach → dispatch → inspect, and on a 401 continues with
//! reauth → retry (once) or reauth → logout. A 401 on the retry is final.

use crate::error::{GatewayError, GatewayResult};
use crate::lifecycle::SessionLifecycle;
use crate::reauth::ReauthCoordinator;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

/// Wraps every business call with credential handling.
#[derive(Clone)]
pub struct RequestGateway {
    transport: Arc<dyn HttpTransport>,
    coordinator: ReauthCoordinator,
    lifecycle: SessionLifecycle,
    report_errors: bool,
}

impl RequestGateway {
    pub fn new(
        lifecycle: SessionLifecycle,
        coordinator: ReauthCoordinator,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            coordinator,
            lifecycle,
            report_errors: false,
        }
    }

    /// Log terminal failures at `warn` level.
    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    /// Sends `request` with the current credentials.
    ///
    /// Returns the response for 2xx statuses. Any other status is an error;
    /// a 401 is only returned after refresh failed (the original 401) or the
    /// retry was rejected as well. Transport errors pass through untouched.
    pub async fn execute(&self, request: ApiRequest) -> GatewayResult<ApiResponse> {
        let span = info_span!(
            "gateway",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = %request.path,
        );

        let result = self.run(&request).instrument(span.clone()).await;

        if self.report_errors {
            if let Err(ref e) = result {
                span.in_scope(|| {
                    warn!(status = ?e.status().map(|s| s.as_u16()), "request failed: {e}");
                });
            }
        }
        result
    }

    async fn run(&self, request: &ApiRequest) -> GatewayResult<ApiResponse> {
        let (session, generation) = self.lifecycle.state().snapshot().await;
        let bearer = session.as_ref().map(|s| s.access_token.as_str());

        let response = self.transport.send(request, bearer).await?;
        if !response.is_unauthorized() {
            return into_result(response);
        }

        debug!(generation, "unauthorized, refreshing credentials");
        match self.coordinator.refresh_stale(generation).await {
            Ok(refreshed) => {
                debug!("retrying with refreshed credentials");
                let retry = self
                    .transport
                    .send(request, Some(&refreshed.access_token))
                    .await?;
                if retry.is_unauthorized() {
                    warn!("retry rejected after refresh, giving up");
                }
                into_result(retry)
            }
            Err(failure) => {
                warn!("credential refresh failed: {failure}");
                // A login that landed after this request was attached wins.
                self.lifecycle
                    .logout_if_current(generation, failure.logout_reason())
                    .await;
                Err(GatewayError::from_status(response.status, &response.body))
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let response = self.execute(ApiRequest::get(path)).await?;
        Ok(response.json()?)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> GatewayResult<T> {
        let response = self.execute(ApiRequest::post(path).json(body)?).await?;
        Ok(response.json()?)
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> GatewayResult<T> {
        let response = self.execute(ApiRequest::put(path).json(body)?).await?;
        Ok(response.json()?)
    }

    pub async fn delete(&self, path: &str) -> GatewayResult<()> {
        self.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }

    pub fn coordinator(&self) -> &ReauthCoordinator {
        &self.coordinator
    }
}

fn into_result(response: ApiResponse) -> GatewayResult<ApiResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(GatewayError::from_status(response.status, &response.body))
    }
}
