//! Error taxonomy shared by every access-control operation.

use thiserror::Error;

/// Failure of a ceremony, booking or unlock operation.
///
/// Variants map one-to-one onto the HTTP status classes the service returns;
/// see `handlers::shared_types` for the mapping.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// No session, or the session is not signed in
    #[error("Unauthorized")]
    Unauthorized,

    #[error("User already exists")]
    AlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("No ceremony in progress")]
    NoCeremonyInProgress,

    #[error("Ceremony expired")]
    CeremonyExpired,

    /// Signature, challenge, origin or credential mismatch. Deliberately vague.
    #[error("Authentication failed")]
    VerificationFailed,

    /// Sign counter did not advance and the policy is to reject.
    #[error("Authentication failed")]
    PossibleClone,

    #[error("Booking must end after it starts")]
    InvalidRange,

    #[error("Booking conflict - you already have a booking during this time")]
    Conflict,

    #[error("Not found")]
    NotFound,

    /// Storage or backend failure. Details are logged, never returned.
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AccessError {
    // ---
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Convenience alias for access-control results.
pub type AccessResult<T> = Result<T, AccessError>;
