//! The door-unlock decision: signed in, booked, and on site.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::booking_ledger::BookingLedger;
use super::geofence::{GeoPoint, Geofence, GeofenceDecision};
use crate::domain::{AccessError, AccessResult, SessionState};

/// Result of an unlock request that got past authentication.
#[derive(Debug, Clone, PartialEq)]
pub enum UnlockOutcome {
    Granted { booking_id: Uuid, distance_km: f64 },
    NoActiveBooking,
    TooFar { distance_km: f64, site: GeoPoint },
}

/// Composes the booking ledger and the geofence into one decision.
#[derive(Clone)]
pub struct DoorAccess {
    // ---
    ledger: BookingLedger,
    geofence: Geofence,
}

impl DoorAccess {
    // ---
    pub fn new(ledger: BookingLedger, geofence: Geofence) -> Self {
        Self { ledger, geofence }
    }

    /// Decide whether the session's user may open the door at `now`.
    ///
    /// Checks run in a fixed order: identity, then booking, then location.
    /// Coordinates are not even parsed until a booking has been found.
    pub async fn unlock(
        &self,
        session: &SessionState,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> AccessResult<UnlockOutcome> {
        // ---
        let identity = session.identity().ok_or(AccessError::Unauthorized)?;

        let booking = match self.ledger.get_active_booking(identity.user_id, now).await {
            Ok(booking) => booking,
            Err(AccessError::NotFound) => {
                tracing::info!("Unlock refused for '{}': no active booking", identity.username);
                return Ok(UnlockOutcome::NoActiveBooking);
            }
            Err(e) => return Err(e),
        };

        let client = GeoPoint::checked(latitude, longitude)?;

        match self.geofence.authorize(client) {
            GeofenceDecision::Granted { distance_km } => {
                tracing::info!(
                    "Door unlocked for '{}' (booking {}, {:.3} km from site)",
                    identity.username,
                    booking.id,
                    distance_km
                );
                Ok(UnlockOutcome::Granted {
                    booking_id: booking.id,
                    distance_km,
                })
            }
            GeofenceDecision::Denied { distance_km, site } => {
                tracing::info!(
                    "Unlock refused for '{}': {:.3} km from site",
                    identity.username,
                    distance_km
                );
                Ok(UnlockOutcome::TooFar { distance_km, site })
            }
        }
    }
}
