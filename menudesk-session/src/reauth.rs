//! Single-flight token refresh.
//!
//! At most one refresh call is outstanding per session. The first caller to
//! need a refresh spawns it as a task owned by the coordinator; every caller
//! arriving while it runs awaits the same shared result. Because the task is
//! spawned, a caller that gives up waiting cannot cancel it for the others.
//! The task clears the in-flight slot itself when it finishes, including
//! when it times out or panics. A failed refresh ends the session inside
//! the task.

use crate::error::AuthFailure;
use crate::lifecycle::SessionLifecycle;
use crate::transport::{ApiRequest, HttpTransport};
use crate::types::{AuthResponse, RefreshRequest, Session, SessionEvent};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const REFRESH_PATH: &str = "/auth/refresh";

type RefreshResult = Result<Session, AuthFailure>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshResult>>;

struct InFlight {
    id: u64,
    result: SharedRefresh,
}

enum Plan {
    Join(SharedRefresh),
    /// The session already moved on since the caller's snapshot.
    Reuse,
}

struct CoordinatorInner {
    lifecycle: SessionLifecycle,
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
    in_flight: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
    refresh_calls: AtomicU64,
}

/// Turns "access token expired" into "access token refreshed", once per
/// expiry no matter how many callers notice it.
#[derive(Clone)]
pub struct ReauthCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl ReauthCoordinator {
    pub fn new(
        lifecycle: SessionLifecycle,
        transport: Arc<dyn HttpTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                lifecycle,
                transport,
                timeout,
                in_flight: Mutex::new(None),
                next_id: AtomicU64::new(0),
                refresh_calls: AtomicU64::new(0),
            }),
        }
    }

    /// Refreshes the session, or joins the refresh already in progress.
    pub async fn refresh(&self) -> RefreshResult {
        let generation = self.inner.lifecycle.state().generation();
        self.refresh_stale(generation).await
    }

    /// Like [`refresh`](Self::refresh) for a caller whose request was built
    /// from the session at `observed_generation`. If no refresh is running
    /// and the session has changed since then, the current session is
    /// returned without a network call.
    pub async fn refresh_stale(&self, observed_generation: u64) -> RefreshResult {
        match self.plan(observed_generation) {
            Plan::Join(result) => result.await,
            Plan::Reuse => {
                debug!(observed_generation, "session already replaced, skipping refresh");
                self.inner
                    .lifecycle
                    .state()
                    .current()
                    .await
                    .ok_or(AuthFailure::SessionEnded)
            }
        }
    }

    /// Whether a refresh call is currently outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.inner.slot().is_some()
    }

    /// Number of refresh calls issued to the transport so far.
    pub fn refresh_count(&self) -> u64 {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    fn plan(&self, observed_generation: u64) -> Plan {
        let mut slot = self.inner.slot();

        if let Some(ref in_flight) = *slot {
            debug!(refresh_id = in_flight.id, "joining in-flight refresh");
            return Plan::Join(in_flight.result.clone());
        }

        if self.inner.lifecycle.state().generation() != observed_generation {
            return Plan::Reuse;
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let _release = ReleaseSlot {
                inner: Arc::clone(&inner),
                id,
            };
            inner.refresh_task(id).await
        });

        let result = async move {
            task.await
                .unwrap_or_else(|e| Err(AuthFailure::Aborted(e.to_string())))
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            id,
            result: result.clone(),
        });
        Plan::Join(result)
    }
}

impl CoordinatorInner {
    fn slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs one refresh. A failure ends the session it was refreshing
    /// before the slot is released, so callers arriving afterwards see the
    /// logout instead of starting another doomed refresh.
    async fn refresh_task(&self, id: u64) -> RefreshResult {
        let (session, generation) = self.lifecycle.state().snapshot().await;
        let result = self.run_refresh(id, session, generation).await;

        if let Err(ref failure) = result {
            self.lifecycle
                .logout_if_current(generation, failure.logout_reason())
                .await;
        }
        result
    }

    async fn run_refresh(
        &self,
        id: u64,
        session: Option<Session>,
        generation: u64,
    ) -> RefreshResult {
        let state = self.lifecycle.state();

        let Some(refresh_token) = session.map(|s| s.refresh_token) else {
            warn!(refresh_id = id, "refresh needed but no refresh token is held");
            return Err(AuthFailure::MissingRefreshToken);
        };

        let request = ApiRequest::post(REFRESH_PATH)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .map_err(|e| AuthFailure::InvalidResponse(e.to_string()))?;

        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        debug!(refresh_id = id, "sending refresh request");

        let call = self.transport.send(&request, None);
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(refresh_id = id, "refresh request failed: {e}");
                return Err(AuthFailure::Transport(e));
            }
            Err(_) => {
                warn!(refresh_id = id, timeout = ?self.timeout, "refresh request timed out");
                return Err(AuthFailure::Timeout(self.timeout));
            }
        };

        if !response.is_success() {
            warn!(refresh_id = id, status = %response.status, "refresh rejected");
            return Err(AuthFailure::Rejected {
                status: response.status.as_u16(),
            });
        }

        let auth: AuthResponse = response
            .json()
            .map_err(|e| AuthFailure::InvalidResponse(e.to_string()))?;

        match state.set_credentials_if_current(generation, auth).await {
            Ok(session) => {
                let generation = state.generation();
                info!(refresh_id = id, generation, "access token refreshed");
                self.lifecycle.notify(SessionEvent::Refreshed { generation });
                Ok(session)
            }
            Err(current) => {
                // Logged out or logged in again while the call was out;
                // never resurrect the old session.
                debug!(
                    refresh_id = id,
                    current, "session changed during refresh, discarding result"
                );
                state.current().await.ok_or(AuthFailure::SessionEnded)
            }
        }
    }
}

/// Clears the in-flight slot when the refresh task ends, however it ends.
struct ReleaseSlot {
    inner: Arc<CoordinatorInner>,
    id: u64,
}

impl Drop for ReleaseSlot {
    fn drop(&mut self) {
        let mut slot = self.inner.slot();
        if slot.as_ref().is_some_and(|f| f.id == self.id) {
            *slot = None;
        }
    }
}
