//! Per-user time-window reservations.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AccessError, AccessResult, Booking, BookingStorePtr, InsertOutcome};

/// Creates and answers questions about bookings.
///
/// Conflicts are scoped to one user: two different users may hold
/// overlapping windows.
#[derive(Clone)]
pub struct BookingLedger {
    store: BookingStorePtr,
}

impl BookingLedger {
    // ---
    pub fn new(store: BookingStorePtr) -> Self {
        Self { store }
    }

    /// Reserve `[start, end)` for `user_id`.
    pub async fn create_booking(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AccessResult<Booking> {
        // ---
        if start >= end {
            return Err(AccessError::InvalidRange);
        }

        match self.store.insert_if_free(Booking::new(user_id, start, end)).await? {
            InsertOutcome::Created(booking) => {
                tracing::info!(
                    "Booking {} created for user {}: {} - {}",
                    booking.id,
                    user_id,
                    booking.start,
                    booking.end
                );
                Ok(booking)
            }
            InsertOutcome::Duplicate => {
                tracing::info!("Booking conflict for user {}: {} - {}", user_id, start, end);
                Err(AccessError::Conflict)
            }
        }
    }

    /// The active booking of `user_id` whose window contains `now`.
    pub async fn get_active_booking(&self, user_id: Uuid, now: DateTime<Utc>) -> AccessResult<Booking> {
        // ---
        self.store
            .find_active_at(user_id, now)
            .await?
            .ok_or(AccessError::NotFound)
    }

    /// Every booking of `user_id`, latest start first.
    pub async fn list_bookings(&self, user_id: Uuid) -> AccessResult<Vec<Booking>> {
        Ok(self.store.list_for_user(user_id).await?)
    }
}
