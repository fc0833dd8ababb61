//! Session teardown and change notifications.

use crate::session_state::SessionState;
use crate::types::{CacheTag, LogoutReason, SessionEvent};
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Ends sessions and tells subscribers when session-scoped data goes stale.
#[derive(Clone)]
pub struct SessionLifecycle {
    state: SessionState,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionLifecycle {
    pub fn new(state: SessionState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { state, events }
    }

    /// Clears the in-memory session and its persisted mirror, then notifies
    /// subscribers. Returns `false` (and emits nothing) when already logged
    /// out.
    pub async fn logout(&self, reason: LogoutReason) -> bool {
        let cleared = self.state.clear().await;
        self.finish_logout(cleared, reason)
    }

    /// Logout that loses to any login or refresh completed after
    /// `generation` was observed.
    pub(crate) async fn logout_if_current(&self, generation: u64, reason: LogoutReason) -> bool {
        let cleared = self.state.clear_if_current(generation).await;
        self.finish_logout(cleared, reason)
    }

    fn finish_logout(&self, cleared: bool, reason: LogoutReason) -> bool {
        if !cleared {
            debug!(?reason, "logout requested with no active session");
            return false;
        }

        info!(?reason, "session ended");
        self.notify(SessionEvent::LoggedOut {
            reason,
            invalidated: CacheTag::ALL.to_vec(),
        });
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Having no subscribers is normal.
    pub(crate) fn notify(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
