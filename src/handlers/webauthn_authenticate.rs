//! Passkey login and logout handlers.
//!
//! Two-phase flow:
//! 1. `login_begin` - return request options restricted to the user's credentials
//! 2. `login_finish` - verify the assertion, apply the sign-counter policy, sign in

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::Value;

use super::shared_types::{parse_body, with_session_cookie, JsonBody, StatusResponse};
use crate::app_state::AppState;
use crate::domain::AccessError;

#[derive(Debug, Deserialize)]
pub struct LoginBeginRequest {
    // ---
    #[serde(default)]
    pub username: String,
}

/// POST /login/begin
///
/// # Request Body
/// ```json
/// { "username": "frodo" }
/// ```
///
/// # Response
/// WebAuthn request options for `navigator.credentials.get()`.
#[tracing::instrument(skip_all)]
pub async fn login_begin(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<LoginBeginRequest>,
) -> Result<Response, AccessError> {
    // ---
    let req = parse_body(body)?;
    let mut session = state.sessions().from_headers(&headers).await?;

    let options = state
        .ceremony()
        .begin_login(&mut session.state, &req.username)
        .await
        .inspect_err(|_| state.metrics().record_ceremony("login_begin", "failure"))?;

    state.sessions().save(&session).await?;
    state.metrics().record_ceremony("login_begin", "success");

    Ok(with_session_cookie(state.sessions(), &session, Json(options)))
}

/// POST /login/finish
///
/// # Request Body
/// The `PublicKeyCredential` produced by `navigator.credentials.get()`.
///
/// # Response
/// `{"status": "success"}`, with `"clone_warning": true` when the
/// authenticator's sign counter did not advance.
#[tracing::instrument(skip_all)]
pub async fn login_finish(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<Value>,
) -> Result<Response, AccessError> {
    // ---
    let mut session = state.sessions().from_headers(&headers).await?;
    let response = parse_body(body)?;

    let result = state
        .ceremony()
        .finish_login(&mut session.state, &response)
        .await;

    state.sessions().save(&session).await?;

    match result {
        Ok(outcome) => {
            state.sessions().renew(&mut session).await?;
            state.metrics().record_ceremony("login_finish", "success");
            tracing::debug!(
                "{} signed in with credential {} (counter {})",
                outcome.username,
                URL_SAFE_NO_PAD.encode(&outcome.credential_id),
                outcome.sign_count
            );
            if outcome.clone_warning {
                state.metrics().record_clone_warning();
            }
            let body = StatusResponse {
                clone_warning: outcome.clone_warning,
                ..StatusResponse::success()
            };
            Ok(with_session_cookie(state.sessions(), &session, Json(body)))
        }
        Err(e) => {
            if matches!(e, AccessError::PossibleClone) {
                state.metrics().record_clone_warning();
            }
            state.metrics().record_ceremony("login_finish", "failure");
            Err(e)
        }
    }
}

/// GET|POST /logout
///
/// Clears the session's identity and redirects to `/login`. Never fails.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    // ---
    let mut session = match state.sessions().from_headers(&headers).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Logout could not load session: {}", e);
            return Redirect::to("/login").into_response();
        }
    };

    if let Some(identity) = session.state.identity() {
        tracing::info!("User '{}' logged out", identity.username);
    }
    state.sessions().destroy(&mut session).await;

    with_session_cookie(state.sessions(), &session, Redirect::to("/login"))
}
