use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::{AccessError, AccessResult};
use crate::session::{Session, SessionManager};

/// A JSON request body whose rejection is left to the handler.
///
/// Handlers check the session first, so an anonymous caller is told 401
/// whatever it sent.
pub type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Unwrap a [`JsonBody`]; a rejected body is a validation error.
pub fn parse_body<T>(body: JsonBody<T>) -> AccessResult<T> {
    // ---
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AccessError::validation("Invalid request body")
    })
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    // ---
    pub error: String,
}

/// `{"status": "success"}`, optionally flagging a clone warning.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    // ---
    pub status: &'static str,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub clone_warning: bool,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success",
            clone_warning: false,
        }
    }
}

impl AccessError {
    // ---
    pub fn status_code(&self) -> StatusCode {
        // ---
        match self {
            AccessError::Validation(_)
            | AccessError::NoCeremonyInProgress
            | AccessError::CeremonyExpired
            | AccessError::InvalidRange => StatusCode::BAD_REQUEST,
            AccessError::Unauthorized
            | AccessError::VerificationFailed
            | AccessError::PossibleClone => StatusCode::UNAUTHORIZED,
            AccessError::AlreadyExists | AccessError::Conflict => StatusCode::CONFLICT,
            AccessError::UserNotFound | AccessError::NotFound => StatusCode::NOT_FOUND,
            AccessError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        // ---
        if let AccessError::Internal(e) = &self {
            tracing::error!("Request failed: {:?}", e);
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Attach the session cookie to `body`.
pub fn with_session_cookie(
    sessions: &SessionManager,
    session: &Session,
    body: impl IntoResponse,
) -> Response {
    // ---
    ([(header::SET_COOKIE, sessions.cookie(session))], body).into_response()
}
