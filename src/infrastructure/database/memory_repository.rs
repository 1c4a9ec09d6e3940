use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Booking, BookingStore, Credential, CredentialStore, InsertOutcome, User};

pub fn create_memory_repository() -> Arc<MemoryRepository> {
    // ---
    Arc::new(MemoryRepository::default())
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    credentials: Vec<Credential>,
    bookings: Vec<Booking>,
}

/// Process-local store for users, credentials and bookings.
///
/// One lock covers all tables, which makes every check-then-insert atomic.
#[derive(Default)]
pub struct MemoryRepository {
    // ---
    tables: Mutex<Tables>,
}

#[async_trait::async_trait]
impl CredentialStore for MemoryRepository {
    // ---
    async fn create_user(&self, user: User) -> Result<InsertOutcome<User>> {
        // ---
        let mut tables = self.tables.lock();
        if tables.users.values().any(|u| u.username == user.username) {
            return Ok(InsertOutcome::Duplicate);
        }
        tables.users.insert(user.id, user.clone());
        Ok(InsertOutcome::Created(user))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.lock();
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.lock().users.get(&user_id).cloned())
    }

    async fn save_credential(&self, credential: Credential) -> Result<()> {
        // ---
        let mut tables = self.tables.lock();
        if !tables.users.contains_key(&credential.user_id) {
            anyhow::bail!("user {} does not exist", credential.user_id);
        }
        if tables.credentials.iter().any(|c| c.id == credential.id) {
            anyhow::bail!("credential {} already exists", hex::encode(&credential.id));
        }
        tables.credentials.push(credential);
        Ok(())
    }

    async fn get_credentials_by_user(&self, user_id: Uuid) -> Result<Vec<Credential>> {
        // ---
        let tables = self.tables.lock();
        Ok(tables
            .credentials
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_credential_by_id(&self, credential_id: &[u8]) -> Result<Option<Credential>> {
        // ---
        let tables = self.tables.lock();
        Ok(tables
            .credentials
            .iter()
            .find(|c| c.id == credential_id)
            .cloned())
    }

    async fn update_sign_count(
        &self,
        credential_id: &[u8],
        sign_count: u32,
        backup_state: bool,
    ) -> Result<()> {
        // ---
        let mut tables = self.tables.lock();
        let credential = tables
            .credentials
            .iter_mut()
            .find(|c| c.id == credential_id)
            .ok_or_else(|| anyhow::anyhow!("credential {} does not exist", hex::encode(credential_id)))?;

        credential.sign_count = sign_count;
        credential.backup_state = backup_state;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl BookingStore for MemoryRepository {
    // ---
    async fn insert_if_free(&self, booking: Booking) -> Result<InsertOutcome<Booking>> {
        // ---
        let mut tables = self.tables.lock();
        let taken = tables
            .bookings
            .iter()
            .any(|b| b.user_id == booking.user_id && b.is_active() && b.overlaps(booking.start, booking.end));

        if taken {
            return Ok(InsertOutcome::Duplicate);
        }
        tables.bookings.push(booking.clone());
        Ok(InsertOutcome::Created(booking))
    }

    async fn find_active_at(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<Option<Booking>> {
        // ---
        let tables = self.tables.lock();
        Ok(tables
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id && b.is_active() && b.contains(at))
            .max_by_key(|b| b.start)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>> {
        // ---
        let mut bookings: Vec<Booking> = self
            .tables
            .lock()
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();

        bookings.sort_by(|a, b| b.start.cmp(&a.start));
        Ok(bookings)
    }
}
