//! Typed server-side session state and the store contract behind it.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Which ceremony a pending payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeremonyKind {
    Registration,
    Login,
}

/// Challenge state kept between a `Begin*` and its matching `Finish*`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingCeremony {
    // ---
    pub kind: CeremonyKind,
    pub user_id: Uuid,
    pub username: String,

    /// Verifier-owned challenge state, opaque to everything else.
    pub challenge_state: serde_json::Value,

    /// Credential IDs the client may answer with. Empty for registration.
    pub allowed_credentials: Vec<Vec<u8>>,

    pub expires_at: DateTime<Utc>,
}

impl PendingCeremony {
    // ---
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn allows(&self, credential_id: &[u8]) -> bool {
        self.allowed_credentials
            .iter()
            .any(|id| id.as_slice() == credential_id)
    }
}

/// Everything the server remembers about one client token.
///
/// The shape is fixed: a stored blob either decodes into this record or the
/// session is treated as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    // ---
    pub authenticated: bool,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub pending: Option<PendingCeremony>,
}

/// Identity of an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: Uuid,
    pub username: String,
}

impl SessionState {
    // ---
    /// The caller's identity, present only when the session is authenticated.
    pub fn identity(&self) -> Option<SessionInfo> {
        // ---
        if !self.authenticated {
            return None;
        }
        let user_id = self.user_id?;
        Some(SessionInfo {
            user_id,
            username: self.username.clone().unwrap_or_default(),
        })
    }

    pub fn sign_in(&mut self, user_id: Uuid, username: String) {
        // ---
        self.authenticated = true;
        self.user_id = Some(user_id);
        self.username = Some(username);
        self.pending = None;
    }

    /// Drop identity but leave any in-flight ceremony alone.
    pub fn sign_out(&mut self) {
        // ---
        self.authenticated = false;
        self.user_id = None;
        self.username = None;
    }
}

/// Storage for session state keyed by the opaque client token.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    // ---
    /// Load the state for `token`. Unknown, expired and undecodable entries are `None`.
    async fn load(&self, token: &str) -> Result<Option<SessionState>>;

    /// Store `state` under `token`, replacing any previous value.
    async fn store(&self, token: &str, state: &SessionState, ttl: Duration) -> Result<()>;

    /// Remove `token` entirely.
    async fn remove(&self, token: &str) -> Result<()>;
}

/// Type alias for any backend that implements SessionStore.
pub type SessionStorePtr = Arc<dyn SessionStore>;
