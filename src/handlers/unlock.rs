use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::shared_types::{parse_body, JsonBody};
use crate::app_state::AppState;
use crate::domain::AccessError;
use crate::services::UnlockOutcome;

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// Body of every answered unlock request.
///
/// Refusals are `status: "error"` with HTTP 200; only missing
/// authentication and bad input are transport-level errors.
#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    // ---
    pub status: &'static str,
    pub message: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_navigate: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio_lat: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio_lon: Option<f64>,
}

impl UnlockResponse {
    fn message(status: &'static str, message: &'static str) -> Self {
        Self {
            status,
            message,
            distance: None,
            show_navigate: None,
            studio_lat: None,
            studio_lon: None,
        }
    }
}

impl From<UnlockOutcome> for UnlockResponse {
    fn from(outcome: UnlockOutcome) -> Self {
        // ---
        match outcome {
            UnlockOutcome::Granted { .. } => Self::message("success", "Door unlocked! Welcome."),
            UnlockOutcome::NoActiveBooking => Self::message(
                "error",
                "No active booking found. Please book a time slot first.",
            ),
            UnlockOutcome::TooFar { distance_km, site } => Self {
                distance: Some(distance_km),
                show_navigate: Some(true),
                studio_lat: Some(site.lat),
                studio_lon: Some(site.lon),
                ..Self::message("error", "Please go to the front door for the door to open.")
            },
        }
    }
}

fn outcome_label(outcome: &UnlockOutcome) -> &'static str {
    match outcome {
        UnlockOutcome::Granted { .. } => "granted",
        UnlockOutcome::NoActiveBooking => "no_booking",
        UnlockOutcome::TooFar { .. } => "too_far",
    }
}

/// POST /unlock
///
/// # Request Body
/// ```json
/// { "latitude": 51.5074, "longitude": -0.1278 }
/// ```
#[tracing::instrument(skip_all)]
pub async fn unlock_door(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<UnlockRequest>,
) -> Result<Json<UnlockResponse>, AccessError> {
    // ---
    let session = state.sessions().from_headers(&headers).await?;
    if session.state.identity().is_none() {
        return Err(AccessError::Unauthorized);
    }
    let req = parse_body(body)?;

    let outcome = state
        .door()
        .unlock(&session.state, req.latitude, req.longitude, Utc::now())
        .await?;
    state.metrics().record_unlock(outcome_label(&outcome));

    Ok(Json(outcome.into()))
}
