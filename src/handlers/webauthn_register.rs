//! Passkey registration handlers.
//!
//! Two-phase flow:
//! 1. `register_begin` - create the user and return credential creation options
//! 2. `register_finish` - verify the attestation and bind the credential

use axum::{extract::State, http::HeaderMap, response::Response, Json};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::Value;

use super::shared_types::{parse_body, with_session_cookie, JsonBody, StatusResponse};
use crate::app_state::AppState;
use crate::domain::AccessError;

#[derive(Debug, Deserialize)]
pub struct RegistrationBeginRequest {
    // ---
    #[serde(default)]
    pub username: String,

    #[serde(default, rename = "displayName", alias = "display_name")]
    pub display_name: String,
}

/// POST /register/begin
///
/// # Request Body
/// ```json
/// { "username": "frodo", "displayName": "Frodo Baggins" }
/// ```
///
/// # Response
/// WebAuthn credential creation options for `navigator.credentials.create()`,
/// plus the session cookie holding the pending challenge.
#[tracing::instrument(skip_all)]
pub async fn register_begin(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<RegistrationBeginRequest>,
) -> Result<Response, AccessError> {
    // ---
    let req = parse_body(body)?;
    let mut session = state.sessions().from_headers(&headers).await?;

    let options = state
        .ceremony()
        .begin_registration(&mut session.state, &req.username, &req.display_name)
        .await
        .inspect_err(|_| state.metrics().record_ceremony("register_begin", "failure"))?;

    state.sessions().save(&session).await?;
    state.metrics().record_ceremony("register_begin", "success");

    Ok(with_session_cookie(state.sessions(), &session, Json(options)))
}

/// POST /register/finish
///
/// # Request Body
/// The `PublicKeyCredential` produced by `navigator.credentials.create()`.
///
/// # Response
/// `{"status": "success"}`; the session is now signed in.
#[tracing::instrument(skip_all)]
pub async fn register_finish(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<Value>,
) -> Result<Response, AccessError> {
    // ---
    let mut session = state.sessions().from_headers(&headers).await?;
    let response = parse_body(body)?;

    let result = state
        .ceremony()
        .finish_registration(&mut session.state, &response)
        .await;

    // The pending challenge is spent either way.
    state.sessions().save(&session).await?;

    match result {
        Ok(outcome) => {
            state.sessions().renew(&mut session).await?;
            state.metrics().record_ceremony("register_finish", "success");
            tracing::debug!(
                "Registered credential {} for {}",
                URL_SAFE_NO_PAD.encode(&outcome.credential_id),
                outcome.username
            );
            Ok(with_session_cookie(
                state.sessions(),
                &session,
                Json(StatusResponse::success()),
            ))
        }
        Err(e) => {
            state.metrics().record_ceremony("register_finish", "failure");
            Err(e)
        }
    }
}
