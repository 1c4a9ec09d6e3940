mod booking_ledger;
mod ceremony;
mod door;
mod geofence;
mod rate_limiter;

pub use booking_ledger::BookingLedger;
pub use ceremony::{counter_regressed, Ceremony, LoginOutcome, RegistrationOutcome, MAX_CEREMONY_TTL};
pub use door::{DoorAccess, UnlockOutcome};
pub use geofence::{distance_km, GeoPoint, Geofence, GeofenceDecision, DEFAULT_RADIUS_KM, EARTH_RADIUS_KM};
pub use rate_limiter::RateLimiter;
