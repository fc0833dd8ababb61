//! Persistence mirror for the current session.
//!
//! The record is three storage keys written and erased together. Loading
//! validates the access token's expiry claim before trusting it; anything
//! stale, partial or malformed is erased and reported as "no session".

use crate::token;
use crate::types::{Identity, Session};
use chrono::Utc;
use menudesk_storage::{KeyValueStore, StorageResult};
use std::sync::Arc;
use tracing::{debug, warn};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const IDENTITY_KEY: &str = "user";

const ALL_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, IDENTITY_KEY];

/// Reads and writes the persisted session record.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Loads the persisted session if it is complete and not expired.
    ///
    /// Never fails: unreadable or invalid records are erased and `None` is
    /// returned.
    pub fn load(&self) -> Option<Session> {
        match self.read_record() {
            Ok(Some(session)) => Some(session),
            Ok(None) => None,
            Err(reason) => {
                debug!("discarding persisted session: {reason}");
                if let Err(e) = self.clear() {
                    warn!("failed to erase invalid persisted session: {e}");
                }
                None
            }
        }
    }

    /// `Ok(None)` means nothing was stored at all; `Err` carries the reason a
    /// stored record was rejected.
    fn read_record(&self) -> Result<Option<Session>, String> {
        let read = |key: &str| {
            self.storage
                .get(key)
                .map_err(|e| format!("failed to read {key}: {e}"))
        };

        let access = read(ACCESS_TOKEN_KEY)?;
        let refresh = read(REFRESH_TOKEN_KEY)?;
        let identity = read(IDENTITY_KEY)?;

        let (access_token, refresh_token, identity) = match (access, refresh, identity) {
            (None, None, None) => return Ok(None),
            (Some(a), Some(r), Some(i)) => (a, r, i),
            _ => return Err("record is incomplete".to_string()),
        };

        token::check_fresh(&access_token, Utc::now()).map_err(|e| e.to_string())?;

        let identity: Identity =
            serde_json::from_str(&identity).map_err(|e| format!("identity is malformed: {e}"))?;

        Ok(Some(Session {
            access_token,
            refresh_token,
            identity,
        }))
    }

    /// Persists all three parts of `session`. A failed write erases whatever
    /// part of the record may already have landed.
    pub fn save(&self, session: &Session) -> StorageResult<()> {
        let identity = serde_json::to_string(&session.identity)?;
        let result = self.storage.set_many(&[
            (ACCESS_TOKEN_KEY, session.access_token.as_str()),
            (REFRESH_TOKEN_KEY, session.refresh_token.as_str()),
            (IDENTITY_KEY, identity.as_str()),
        ]);

        if let Err(e) = result {
            if let Err(clear_err) = self.clear() {
                warn!("failed to roll back partial session write: {clear_err}");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Erases the persisted record.
    pub fn clear(&self) -> StorageResult<()> {
        self.storage.remove_many(&ALL_KEYS)
    }
}
