//! Booking handlers. Both require a signed-in session.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shared_types::{parse_body, JsonBody};
use crate::app_state::AppState;
use crate::domain::{AccessError, AccessResult, Booking, BookingStatus, SessionInfo};

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    // ---
    /// Epoch seconds
    #[serde(default)]
    pub start_time: Option<i64>,

    /// Epoch seconds
    #[serde(default)]
    pub end_time: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    // ---
    pub status: &'static str,
    pub booking_id: Uuid,
}

/// A booking as rendered to clients, times in epoch seconds.
#[derive(Debug, Serialize)]
pub struct BookingView {
    pub id: Uuid,
    pub start_time: i64,
    pub end_time: i64,
    pub status: BookingStatus,
    pub created_at: i64,
}

impl From<Booking> for BookingView {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            start_time: b.start.timestamp(),
            end_time: b.end.timestamp(),
            status: b.status,
            created_at: b.created_at.timestamp(),
        }
    }
}

/// Load the request's session and require it to be signed in.
async fn require_identity(state: &AppState, headers: &HeaderMap) -> AccessResult<SessionInfo> {
    // ---
    let session = state.sessions().from_headers(headers).await?;
    session.state.identity().ok_or(AccessError::Unauthorized)
}

fn epoch(secs: Option<i64>) -> AccessResult<DateTime<Utc>> {
    // ---
    match secs {
        None | Some(0) => Err(AccessError::validation("Start time and end time required")),
        Some(secs) => DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| AccessError::validation("Time out of range")),
    }
}

/// POST /booking/create
///
/// # Request Body
/// ```json
/// { "start_time": 1767261600, "end_time": 1767265200 }
/// ```
#[tracing::instrument(skip_all)]
pub async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<CreateBookingRequest>,
) -> Result<Json<CreateBookingResponse>, AccessError> {
    // ---
    let identity = require_identity(&state, &headers).await?;
    let req = parse_body(body)?;
    let start = epoch(req.start_time)?;
    let end = epoch(req.end_time)?;

    let booking = state.ledger().create_booking(identity.user_id, start, end).await?;
    state.metrics().record_booking_created();

    Ok(Json(CreateBookingResponse {
        status: "success",
        booking_id: booking.id,
    }))
}

/// GET /bookings
///
/// The caller's bookings, latest start first.
pub async fn list_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingView>>, AccessError> {
    // ---
    let identity = require_identity(&state, &headers).await?;
    let bookings = state.ledger().list_bookings(identity.user_id).await?;

    Ok(Json(bookings.into_iter().map(BookingView::from).collect()))
}
