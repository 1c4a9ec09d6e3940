use super::booking::Booking;
use super::webauthn_models::{Credential, InsertOutcome, User};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Durable storage for users and their passkeys.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    // ---
    /// Insert a new user. Returns `Duplicate` if the username is taken.
    async fn create_user(&self, user: User) -> Result<InsertOutcome<User>>;

    /// Get user by username.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by ID.
    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Save a new credential for a user.
    async fn save_credential(&self, credential: Credential) -> Result<()>;

    /// Get all credentials for a user.
    async fn get_credentials_by_user(&self, user_id: Uuid) -> Result<Vec<Credential>>;

    /// Get a specific credential by its ID.
    async fn get_credential_by_id(&self, credential_id: &[u8]) -> Result<Option<Credential>>;

    /// Overwrite the stored sign counter and backup state after a login.
    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        sign_count: u32,
        backup_state: bool,
    ) -> Result<()>;

    /// Cheap liveness probe used by the full health check.
    async fn ping(&self) -> Result<()>;
}

/// Durable storage for bookings.
#[async_trait::async_trait]
pub trait BookingStore: Send + Sync {
    // ---
    /// Insert `booking` unless an active booking of the same user overlaps it.
    ///
    /// The overlap check and the insert must be atomic with respect to other
    /// callers booking for the same user.
    async fn insert_if_free(&self, booking: Booking) -> Result<InsertOutcome<Booking>>;

    /// The active booking of `user_id` whose window contains `at`, if any.
    async fn find_active_at(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<Option<Booking>>;

    /// All bookings of `user_id`, latest start first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>>;
}

/// Type alias for any backend that implements CredentialStore.
pub type CredentialStorePtr = Arc<dyn CredentialStore>;

/// Type alias for any backend that implements BookingStore.
pub type BookingStorePtr = Arc<dyn BookingStore>;
