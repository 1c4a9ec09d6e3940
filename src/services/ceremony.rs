//! Passkey registration and login ceremonies.
//!
//! Each ceremony is two calls. `begin_*` issues a challenge and parks it in
//! the session as a [`PendingCeremony`]; `finish_*` consumes the pending
//! payload whatever the outcome, so a challenge can be answered at most once.

use chrono::{TimeDelta, Utc};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::config::ClonePolicy;
use crate::domain::{
    AccessError, AccessResult, CeremonyKind, Credential, CredentialStorePtr, InsertOutcome,
    PendingCeremony, SessionState, User, VerifierPtr,
};

/// Upper bound for how long a challenge may stay open.
pub const MAX_CEREMONY_TTL: Duration = Duration::from_secs(600);

/// A completed registration.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub user_id: Uuid,
    pub username: String,
    pub credential_id: Vec<u8>,
}

/// A completed login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub username: String,
    pub credential_id: Vec<u8>,
    pub sign_count: u32,

    /// The authenticator's counter did not advance; the credential may have
    /// been cloned. Only ever true under [`ClonePolicy::Warn`].
    pub clone_warning: bool,
}

/// Decide whether a reported counter indicates a cloned authenticator.
///
/// Authenticators without counter support report zero forever, so two zeros
/// are not suspicious. Anything else must strictly increase.
pub fn counter_regressed(stored: u32, reported: u32) -> bool {
    // ---
    (stored != 0 || reported != 0) && reported <= stored
}

/// Registration and login state machine.
pub struct Ceremony {
    // ---
    credentials: CredentialStorePtr,
    verifier: VerifierPtr,
    ttl: TimeDelta,
    clone_policy: ClonePolicy,
}

impl Ceremony {
    // ---
    pub fn new(
        credentials: CredentialStorePtr,
        verifier: VerifierPtr,
        ttl: Duration,
        clone_policy: ClonePolicy,
    ) -> Self {
        // ---
        if ttl > MAX_CEREMONY_TTL {
            tracing::warn!(
                "Ceremony TTL of {}s exceeds the {}s maximum, clamping",
                ttl.as_secs(),
                MAX_CEREMONY_TTL.as_secs()
            );
        }
        let ttl = TimeDelta::from_std(ttl.min(MAX_CEREMONY_TTL)).unwrap_or(TimeDelta::minutes(5));

        Self {
            credentials,
            verifier,
            ttl,
            clone_policy,
        }
    }

    /// Create the user and issue a registration challenge.
    ///
    /// Returns the options for `navigator.credentials.create()`.
    pub async fn begin_registration(
        &self,
        session: &mut SessionState,
        username: &str,
        display_name: &str,
    ) -> AccessResult<Value> {
        // ---
        let username = username.trim();
        let display_name = display_name.trim();
        if username.is_empty() || display_name.is_empty() {
            return Err(AccessError::validation("Username and display name required"));
        }

        if self.credentials.get_user_by_username(username).await?.is_some() {
            tracing::info!("Registration refused, user {} already exists", username);
            return Err(AccessError::AlreadyExists);
        }

        let user = match self
            .credentials
            .create_user(User::new(username.to_string(), display_name.to_string()))
            .await?
        {
            InsertOutcome::Created(user) => user,
            InsertOutcome::Duplicate => {
                tracing::info!("Registration lost a race for username {}", username);
                return Err(AccessError::AlreadyExists);
            }
        };
        tracing::info!("User created: {} ({})", user.username, user.id);

        let challenge = self.verifier.begin_registration(&user)?;

        session.pending = Some(PendingCeremony {
            kind: CeremonyKind::Registration,
            user_id: user.id,
            username: user.username.clone(),
            challenge_state: challenge.state,
            allowed_credentials: Vec::new(),
            expires_at: Utc::now() + self.ttl,
        });

        Ok(challenge.options)
    }

    /// Verify the authenticator's attestation and bind the new credential.
    ///
    /// On success the session is signed in as the new user.
    pub async fn finish_registration(
        &self,
        session: &mut SessionState,
        response: &Value,
    ) -> AccessResult<RegistrationOutcome> {
        // ---
        let pending = take_pending(session, CeremonyKind::Registration)?;

        let key = self
            .verifier
            .finish_registration(&pending.challenge_state, response)
            .map_err(|e| {
                //
                tracing::warn!("Registration verification failed for {}: {:?}", pending.username, e);
                AccessError::VerificationFailed
            })?;

        if self.credentials.get_user_by_id(pending.user_id).await?.is_none() {
            return Err(anyhow::anyhow!("user {} vanished mid-registration", pending.user_id).into());
        }

        if self
            .credentials
            .get_credential_by_id(&key.credential_id)
            .await?
            .is_some()
        {
            tracing::warn!(
                "Credential {} is already registered",
                hex::encode(&key.credential_id)
            );
            return Err(AccessError::VerificationFailed);
        }

        let credential = Credential::new(key.credential_id.clone(), pending.user_id, key.public_key)
            .with_backup_flags(key.backup_eligible, key.backup_state);
        self.credentials.save_credential(credential).await?;

        tracing::info!(
            "Registration completed for user: {} (credential: {})",
            pending.username,
            hex::encode(&key.credential_id)
        );

        session.sign_in(pending.user_id, pending.username.clone());

        Ok(RegistrationOutcome {
            user_id: pending.user_id,
            username: pending.username,
            credential_id: key.credential_id,
        })
    }

    /// Issue a login challenge restricted to the user's credentials.
    ///
    /// Returns the options for `navigator.credentials.get()`.
    pub async fn begin_login(&self, session: &mut SessionState, username: &str) -> AccessResult<Value> {
        // ---
        let username = username.trim();
        if username.is_empty() {
            return Err(AccessError::validation("Username required"));
        }

        let user = self
            .credentials
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| {
                //
                tracing::info!("Login attempt for unknown user: {}", username);
                AccessError::UserNotFound
            })?;

        let credentials = self.credentials.get_credentials_by_user(user.id).await?;
        if credentials.is_empty() {
            tracing::info!("User '{}' has no registered credentials", username);
            return Err(AccessError::UserNotFound);
        }

        let challenge = self.verifier.begin_login(&credentials)?;

        session.pending = Some(PendingCeremony {
            kind: CeremonyKind::Login,
            user_id: user.id,
            username: user.username,
            challenge_state: challenge.state,
            allowed_credentials: credentials.into_iter().map(|c| c.id).collect(),
            expires_at: Utc::now() + self.ttl,
        });

        Ok(challenge.options)
    }

    /// Verify the assertion, apply the sign-counter policy and sign in.
    pub async fn finish_login(
        &self,
        session: &mut SessionState,
        response: &Value,
    ) -> AccessResult<LoginOutcome> {
        // ---
        let pending = take_pending(session, CeremonyKind::Login)?;

        let assertion = self
            .verifier
            .finish_login(&pending.challenge_state, response)
            .map_err(|e| {
                //
                tracing::warn!("Login verification failed for '{}': {:?}", pending.username, e);
                AccessError::VerificationFailed
            })?;

        let credential_hex = hex::encode(&assertion.credential_id);
        if !pending.allows(&assertion.credential_id) {
            tracing::warn!("Credential {} was not offered to '{}'", credential_hex, pending.username);
            return Err(AccessError::VerificationFailed);
        }

        let stored = self
            .credentials
            .get_credential_by_id(&assertion.credential_id)
            .await?
            .filter(|c| c.user_id == pending.user_id)
            .ok_or_else(|| {
                //
                tracing::error!("Credential {} not found for '{}'", credential_hex, pending.username);
                AccessError::VerificationFailed
            })?;

        let clone_warning = counter_regressed(stored.sign_count, assertion.sign_count);
        if clone_warning {
            tracing::warn!(
                "Clone warning for credential {} of '{}': stored={}, reported={}",
                credential_hex,
                pending.username,
                stored.sign_count,
                assertion.sign_count
            );
            if self.clone_policy == ClonePolicy::Reject {
                return Err(AccessError::PossibleClone);
            }
        }

        // Stored unconditionally, so a replayed counter is recorded as seen.
        self.credentials
            .update_sign_count(&assertion.credential_id, assertion.sign_count, assertion.backup_state)
            .await?;

        session.sign_in(pending.user_id, pending.username.clone());
        tracing::info!("User '{}' authenticated successfully", pending.username);

        Ok(LoginOutcome {
            user_id: pending.user_id,
            username: pending.username,
            credential_id: assertion.credential_id,
            sign_count: assertion.sign_count,
            clone_warning,
        })
    }
}

/// Remove the pending payload of `kind` from the session.
///
/// The payload is consumed even when it turns out to be expired.
fn take_pending(session: &mut SessionState, kind: CeremonyKind) -> AccessResult<PendingCeremony> {
    // ---
    match session.pending.take() {
        Some(pending) if pending.kind == kind => {
            if pending.is_expired(Utc::now()) {
                tracing::info!("{:?} ceremony for '{}' expired", kind, pending.username);
                return Err(AccessError::CeremonyExpired);
            }
            Ok(pending)
        }
        other => {
            // A ceremony of the other kind stays parked.
            session.pending = other;
            Err(AccessError::NoCeremonyInProgress)
        }
    }
}
