//! Application state management.
//!
//! `AppState` is the dependency-injection container handed to every Axum
//! handler through the `State` extractor. It is built once at startup from
//! the configuration plus a set of [`Backends`], and is cheap to clone.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::{BookingStorePtr, CredentialStorePtr, MetricsPtr, SessionStorePtr, VerifierPtr};
use crate::services::{BookingLedger, Ceremony, DoorAccess, GeoPoint, Geofence, RateLimiter};
use crate::session::SessionManager;

/// The swappable collaborators behind the services.
///
/// Production wires Postgres, Redis or memory sessions, and `webauthn-rs`;
/// tests substitute in-memory stores and a deterministic verifier.
pub struct Backends {
    pub metrics: MetricsPtr,
    pub credentials: CredentialStorePtr,
    pub bookings: BookingStorePtr,
    pub sessions: SessionStorePtr,
    pub verifier: VerifierPtr,
}

/// Shared application state passed to all Axum handlers.
///
/// Handlers depend on the services, never on a concrete store. State is
/// immutable after construction apart from the rate limiter's buckets,
/// which carry their own lock.
#[derive(Clone)]
pub struct AppState {
    // ---
    metrics: MetricsPtr,

    /// Kept for the full health check.
    credentials: CredentialStorePtr,

    sessions: SessionManager,
    ceremony: Arc<Ceremony>,
    ledger: BookingLedger,
    door: DoorAccess,

    /// Guards the registration and login endpoints.
    rate_limiter: Arc<RateLimiter>,
    trust_forwarded_for: bool,
}

impl AppState {
    // ---
    pub fn new(config: &AppConfig, backends: Backends) -> Self {
        // ---
        let ceremony = Ceremony::new(
            backends.credentials.clone(),
            backends.verifier,
            config.webauthn.ceremony_ttl,
            config.webauthn.clone_policy,
        );

        let ledger = BookingLedger::new(backends.bookings);
        let site = GeoPoint::new(config.site.latitude, config.site.longitude);
        let door = DoorAccess::new(ledger.clone(), Geofence::new(site, config.site.radius_km));

        AppState {
            metrics: backends.metrics,
            credentials: backends.credentials,
            sessions: SessionManager::new(backends.sessions, &config.session),
            ceremony: Arc::new(ceremony),
            ledger,
            door,
            rate_limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        }
    }

    /// Get a reference to the metrics implementation.
    pub(crate) fn metrics(&self) -> &MetricsPtr {
        &self.metrics
    }

    pub(crate) fn credentials(&self) -> &CredentialStorePtr {
        &self.credentials
    }

    pub(crate) fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub(crate) fn ceremony(&self) -> &Ceremony {
        &self.ceremony
    }

    pub(crate) fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    pub(crate) fn door(&self) -> &DoorAccess {
        &self.door
    }

    /// The limiter shared by every clone of this state.
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub(crate) fn trust_forwarded_for(&self) -> bool {
        self.trust_forwarded_for
    }
}
