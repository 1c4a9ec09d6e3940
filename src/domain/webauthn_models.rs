use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person allowed to hold passkeys and book the door.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    // ---
    pub id: Uuid,

    /// Login name. Unique and never changed after registration.
    pub username: String,

    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    // ---
    pub fn new(username: String, display_name: String) -> Self {
        // ---
        Self {
            id: Uuid::new_v4(),
            username,
            display_name,
            created_at: Utc::now(),
        }
    }
}

/// A passkey bound to a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    // ---
    /// Unique credential ID (from authenticator)
    pub id: Vec<u8>,

    /// User this credential belongs to
    pub user_id: Uuid,

    /// Serialized public key material, opaque to everything but the verifier
    pub public_key: Vec<u8>,

    /// Last sign counter reported by the authenticator
    pub sign_count: u32,

    pub backup_eligible: bool,
    pub backup_state: bool,

    /// When this credential was created
    pub created_at: DateTime<Utc>,
}

impl Credential {
    // ---
    pub fn new(id: Vec<u8>, user_id: Uuid, public_key: Vec<u8>) -> Self {
        // ---
        Self {
            id,
            user_id,
            public_key,
            sign_count: 0,
            backup_eligible: false,
            backup_state: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_backup_flags(mut self, eligible: bool, state: bool) -> Self {
        // ---
        self.backup_eligible = eligible;
        self.backup_state = state;
        self
    }
}

/// Result of an insert guarded by a uniqueness or exclusion rule.
///
/// Backends report a violated rule as `Duplicate` instead of an error so that
/// a lost race and a failed pre-check look the same to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    Created(T),
    Duplicate,
}
