mod booking;
mod error;
mod metrics;
mod repository;
mod session_state;
mod verifier;
mod webauthn_models;

// Publicly expose the Metrics abstraction
pub use metrics::{Metrics, MetricsPtr};

// Persistence contracts and the records they hold
pub use booking::{intervals_overlap, Booking, BookingStatus};
pub use repository::{BookingStore, BookingStorePtr, CredentialStore, CredentialStorePtr};
pub use webauthn_models::{Credential, InsertOutcome, User};

// Sessions and ceremonies
pub use session_state::{
    CeremonyKind, PendingCeremony, SessionInfo, SessionState, SessionStore, SessionStorePtr,
};
pub use verifier::{IssuedChallenge, PasskeyVerifier, RegisteredKey, VerifiedAssertion, VerifierPtr};

pub use error::{AccessError, AccessResult};
