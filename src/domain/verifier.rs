use super::webauthn_models::{Credential, User};
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

/// A freshly issued challenge.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    /// Options handed to the browser (`navigator.credentials.*`).
    pub options: Value,

    /// State the verifier needs back at finish time.
    pub state: Value,
}

/// Key material produced by a verified registration.
#[derive(Debug, Clone)]
pub struct RegisteredKey {
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub backup_eligible: bool,
    pub backup_state: bool,
}

/// Facts established by a verified login assertion.
#[derive(Debug, Clone)]
pub struct VerifiedAssertion {
    pub credential_id: Vec<u8>,
    pub sign_count: u32,
    pub backup_state: bool,
}

/// Public-key challenge/response primitives.
///
/// Implementations bind challenges to the relying party identity and allowed
/// origins. `finish_*` returns an error whenever the client response does not
/// validate against the state produced by the matching `begin_*`.
pub trait PasskeyVerifier: Send + Sync {
    // ---
    fn begin_registration(&self, user: &User) -> Result<IssuedChallenge>;

    fn finish_registration(&self, state: &Value, response: &Value) -> Result<RegisteredKey>;

    fn begin_login(&self, credentials: &[Credential]) -> Result<IssuedChallenge>;

    fn finish_login(&self, state: &Value, response: &Value) -> Result<VerifiedAssertion>;
}

/// Type alias for any backend that implements PasskeyVerifier.
pub type VerifierPtr = Arc<dyn PasskeyVerifier>;
