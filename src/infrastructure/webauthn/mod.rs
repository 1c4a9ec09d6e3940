//! WebAuthn relying party built on `webauthn-rs`.
//!
//! Provides the factory for the configured `Webauthn` instance and the
//! production [`PasskeyVerifier`]. The stored public key of a credential is
//! the JSON-serialized `Passkey`.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::Value;
use webauthn_rs::prelude::{
    Passkey, PasskeyAuthentication, PasskeyRegistration, PublicKeyCredential,
    RegisterPublicKeyCredential,
};
use webauthn_rs::{Webauthn, WebauthnBuilder};

use crate::config::WebAuthnConfig;
use crate::domain::{
    Credential, IssuedChallenge, PasskeyVerifier, RegisteredKey, User, VerifiedAssertion,
    VerifierPtr,
};

/// Creates a configured WebAuthn instance from application config.
///
/// # Errors
/// Returns an error if the origin URLs or RP ID are malformed, or the RP ID
/// is not an effective domain of the origin.
pub fn create_webauthn(config: &WebAuthnConfig) -> Result<Webauthn> {
    // ---
    tracing::debug!("Creating with config:{:?}", config);

    let url = Url::from_str(config.origin.as_str())?;
    let mut builder = WebauthnBuilder::new(&config.rp_id, &url)?.rp_name(&config.rp_name);

    for extra in &config.extra_origins {
        let extra = Url::from_str(extra).with_context(|| format!("Invalid origin: {extra}"))?;
        builder = builder.append_allowed_origin(&extra);
    }

    Ok(builder.build()?)
}

/// Creates the production verifier.
pub fn create_webauthn_verifier(config: &WebAuthnConfig) -> Result<VerifierPtr> {
    // ---
    Ok(Arc::new(WebauthnVerifier::new(create_webauthn(config)?)))
}

/// [`PasskeyVerifier`] backed by `webauthn-rs` passkey ceremonies.
pub struct WebauthnVerifier {
    webauthn: Webauthn,
}

impl WebauthnVerifier {
    // ---
    pub fn new(webauthn: Webauthn) -> Self {
        Self { webauthn }
    }
}

/// Decode a stored credential into the library's `Passkey`.
///
/// The stored counter is zeroed: the ceremony applies its own sign-counter
/// policy and the library must not reject a regressed counter first.
fn passkey_from_credential(credential: &Credential) -> Result<Passkey> {
    // ---
    let mut json: Value = serde_json::from_slice(&credential.public_key)
        .context("Stored credential is not a serialized passkey")?;
    if let Some(counter) = json.pointer_mut("/cred/counter") {
        *counter = Value::from(0);
    }
    Ok(serde_json::from_value(json)?)
}

fn flag(json: &Value, pointer: &str) -> bool {
    json.pointer(pointer).and_then(Value::as_bool).unwrap_or(false)
}

impl PasskeyVerifier for WebauthnVerifier {
    // ---
    fn begin_registration(&self, user: &User) -> Result<IssuedChallenge> {
        // ---
        let (options, state) = self.webauthn.start_passkey_registration(
            user.id,
            &user.username,
            &user.display_name,
            None,
        )?;

        Ok(IssuedChallenge {
            options: serde_json::to_value(options)?,
            state: serde_json::to_value(state)?,
        })
    }

    fn finish_registration(&self, state: &Value, response: &Value) -> Result<RegisteredKey> {
        // ---
        let state: PasskeyRegistration = serde_json::from_value(state.clone())?;
        let response: RegisterPublicKeyCredential = serde_json::from_value(response.clone())
            .context("Malformed registration response")?;

        let passkey = self.webauthn.finish_passkey_registration(&response, &state)?;
        let passkey_json = serde_json::to_value(&passkey)?;

        Ok(RegisteredKey {
            credential_id: passkey.cred_id().to_vec(),
            public_key: serde_json::to_vec(&passkey_json)?,
            backup_eligible: flag(&passkey_json, "/cred/backup_eligible"),
            backup_state: flag(&passkey_json, "/cred/backup_state"),
        })
    }

    fn begin_login(&self, credentials: &[Credential]) -> Result<IssuedChallenge> {
        // ---
        let passkeys = credentials
            .iter()
            .map(passkey_from_credential)
            .collect::<Result<Vec<_>>>()?;

        let (options, state) = self.webauthn.start_passkey_authentication(&passkeys)?;

        Ok(IssuedChallenge {
            options: serde_json::to_value(options)?,
            state: serde_json::to_value(state)?,
        })
    }

    fn finish_login(&self, state: &Value, response: &Value) -> Result<VerifiedAssertion> {
        // ---
        let state: PasskeyAuthentication = serde_json::from_value(state.clone())?;
        let response: PublicKeyCredential =
            serde_json::from_value(response.clone()).context("Malformed login response")?;

        let result = self.webauthn.finish_passkey_authentication(&response, &state)?;

        Ok(VerifiedAssertion {
            credential_id: result.cred_id().to_vec(),
            sign_count: result.counter(),
            backup_state: result.backup_state(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config(origin: &str) -> WebAuthnConfig {
        WebAuthnConfig {
            rp_id: "localhost".to_string(),
            rp_name: "Test Door".to_string(),
            origin: origin.to_string(),
            extra_origins: vec![],
            ceremony_ttl: Duration::from_secs(300),
            clone_policy: crate::config::ClonePolicy::Warn,
        }
    }

    #[test]
    fn create_webauthn_success() {
        assert!(create_webauthn(&test_config("http://localhost:8080")).is_ok());
    }

    #[test]
    fn create_webauthn_invalid_origin() {
        assert!(create_webauthn(&test_config("not-a-valid-url")).is_err());
    }

    #[test]
    fn create_webauthn_invalid_extra_origin() {
        let mut config = test_config("http://localhost:8080");
        config.extra_origins = vec!["::nope::".to_string()];
        assert!(create_webauthn(&config).is_err());
    }

    #[test]
    fn registration_challenge_is_bound_to_user() {
        // ---
        let verifier = create_webauthn_verifier(&test_config("http://localhost:8080")).unwrap();
        let user = User::new("galadriel".to_string(), "Lady of Light".to_string());

        let challenge = verifier.begin_registration(&user).unwrap();
        let public_key = &challenge.options["publicKey"];
        assert_eq!(public_key["user"]["name"], "galadriel");
        assert_eq!(public_key["user"]["displayName"], "Lady of Light");
        assert_eq!(public_key["rp"]["id"], "localhost");
        assert!(challenge.state.is_object());
    }

    #[test]
    fn garbage_response_fails_verification() {
        // ---
        let verifier = create_webauthn_verifier(&test_config("http://localhost:8080")).unwrap();
        let user = User::new("celeborn".to_string(), "Celeborn".to_string());
        let challenge = verifier.begin_registration(&user).unwrap();

        let response = serde_json::json!({ "id": "abc", "type": "public-key" });
        assert!(verifier.finish_registration(&challenge.state, &response).is_err());
    }

    #[test]
    fn login_rejects_undecodable_stored_key() {
        // ---
        let verifier = create_webauthn_verifier(&test_config("http://localhost:8080")).unwrap();
        let credential = Credential::new(vec![1, 2, 3], uuid::Uuid::new_v4(), b"not json".to_vec());
        assert!(verifier.begin_login(&[credential]).is_err());
    }
}
