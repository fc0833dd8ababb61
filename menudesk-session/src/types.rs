//! Shared session and wire types.

use crate::token;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who the current session belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "username")]
    pub name: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// The credentials and identity of a logged-in user.
///
/// All three parts are always present together; an unauthenticated process
/// has no `Session` at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub identity: Identity,
}

impl Session {
    /// True unless the access token carries an `exp` claim in the past.
    /// Opaque tokens without decodable claims are not provably expired.
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty() && !token::is_provably_expired(&self.access_token)
    }
}

impl From<AuthResponse> for Session {
    fn from(resp: AuthResponse) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            identity: Identity {
                name: resp.username,
                roles: resp.roles.into_iter().collect(),
            },
        }
    }
}

/// Response body of `POST /auth/login` and `POST /auth/refresh`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Data sets whose cached copies are tied to the logged-in session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheTag {
    Dashboard,
    Menu,
    Category,
    Item,
    Restaurant,
    ItemTag,
}

impl CacheTag {
    pub const ALL: [CacheTag; 6] = [
        CacheTag::Dashboard,
        CacheTag::Menu,
        CacheTag::Category,
        CacheTag::Item,
        CacheTag::Restaurant,
        CacheTag::ItemTag,
    ];
}

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoutReason {
    /// Explicit user action.
    UserRequested,
    /// The refresh call was rejected, timed out, or failed in transit.
    RefreshFailed,
    /// A refresh was needed but no refresh token was held.
    MissingRefreshToken,
}

/// Notifications broadcast to session subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { name: String },
    Refreshed { generation: u64 },
    /// Every cached data set in `invalidated` must be treated as stale.
    LoggedOut {
        reason: LogoutReason,
        invalidated: Vec<CacheTag>,
    },
}
