//! In-memory session: the single writable copy.
//!
//! Cloning a `SessionState` yields another handle to the same session.
//! Every mutation updates the [`CredentialStore`] mirror while still holding
//! the write lock, so no reader can observe memory and storage disagreeing
//! about a completed mutation.

use crate::credential_store::CredentialStore;
use crate::types::{AuthResponse, Identity, Session};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

struct StateInner {
    session: RwLock<Option<Session>>,
    store: CredentialStore,
    /// Bumped on every set/clear. Lets a caller holding an older snapshot
    /// tell that the session changed underneath it.
    generation: AtomicU64,
}

/// Shared, injectable session context.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<StateInner>,
}

impl SessionState {
    /// Starts unauthenticated. Storage is not consulted.
    pub fn new(store: CredentialStore) -> Self {
        Self::with_session(store, None)
    }

    /// Starts from whatever valid session the store holds.
    pub fn restore(store: CredentialStore) -> Self {
        let session = store.load();
        if let Some(ref s) = session {
            debug!(user = %s.identity.name, "restored persisted session");
        }
        Self::with_session(store, session)
    }

    fn with_session(store: CredentialStore, session: Option<Session>) -> Self {
        Self {
            inner: Arc::new(StateInner {
                session: RwLock::new(session),
                store,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Replaces the session with the tokens and identity from a login or
    /// refresh response.
    pub async fn set_credentials(&self, response: AuthResponse) -> Session {
        self.set_session(Session::from(response)).await
    }

    pub async fn set_session(&self, session: Session) -> Session {
        let mut guard = self.inner.session.write().await;
        self.install(&mut guard, session)
    }

    /// Applies a refresh response only if no set/clear happened since
    /// `expected_generation` was observed. On mismatch the current
    /// generation is returned and nothing is written.
    pub async fn set_credentials_if_current(
        &self,
        expected_generation: u64,
        response: AuthResponse,
    ) -> Result<Session, u64> {
        let mut guard = self.inner.session.write().await;
        let current = self.inner.generation.load(Ordering::SeqCst);
        if current != expected_generation {
            return Err(current);
        }
        Ok(self.install(&mut guard, Session::from(response)))
    }

    /// Caller must hold the write lock.
    fn install(&self, slot: &mut Option<Session>, session: Session) -> Session {
        if let Err(e) = self.inner.store.save(&session) {
            warn!("failed to persist session, continuing in memory only: {e}");
        }
        *slot = Some(session.clone());
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        session
    }

    /// Drops the session. Returns whether one was present.
    ///
    /// Storage is cleared either way so a stray persisted record cannot
    /// resurrect a session on the next start.
    pub async fn clear(&self) -> bool {
        let mut guard = self.inner.session.write().await;
        self.take(&mut guard)
    }

    /// Clears only if nothing replaced the session since
    /// `expected_generation` was observed.
    pub async fn clear_if_current(&self, expected_generation: u64) -> bool {
        let mut guard = self.inner.session.write().await;
        if self.inner.generation.load(Ordering::SeqCst) != expected_generation {
            return false;
        }
        self.take(&mut guard)
    }

    /// Caller must hold the write lock.
    fn take(&self, slot: &mut Option<Session>) -> bool {
        if let Err(e) = self.inner.store.clear() {
            warn!("failed to erase persisted session: {e}");
        }
        let had_session = slot.take().is_some();
        if had_session {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
        }
        had_session
    }

    pub async fn current(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    /// Session and generation read under one lock acquisition.
    pub async fn snapshot(&self) -> (Option<Session>, u64) {
        let guard = self.inner.session.read().await;
        (guard.clone(), self.inner.generation.load(Ordering::SeqCst))
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .is_some_and(Session::is_authenticated)
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.identity.clone())
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn credential_store(&self) -> &CredentialStore {
        &self.inner.store
    }
}
