//! Booking endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use booking_store::Reservation;
use chrono::{DateTime, Utc};
use common::{ReservationId, SubjectId, UserId};
use domain::{BookingError, CreateReservation, RemoveReservations};
use projections::ReservationView;
use serde::{Deserialize, Serialize};

use super::parse_tags;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub user_id: i64,
    pub subject_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveReservationsQuery {
    pub user_id: i64,
    pub subject_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ActiveQuery {
    /// Instant to inspect; defaults to now.
    pub at: Option<DateTime<Utc>>,
    /// Comma-separated tags every subject must carry.
    pub tags: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct RemovedResponse {
    pub removed: Vec<ReservationId>,
}

// -- Handlers --

/// POST /reservations: book a subject for a period.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), ApiError> {
    let cmd = CreateReservation::new(
        UserId::new(req.user_id),
        SubjectId::new(req.subject_id),
        req.start,
        req.end,
    );

    match state.booking.create(cmd).await {
        Ok(reservation) => Ok((StatusCode::CREATED, Json(reservation))),
        Err(BookingError::AlreadyReserved { conflicting }) => {
            Err(already_booked(&state, conflicting).await)
        }
        Err(e) => Err(e.into()),
    }
}

/// Describes the first blocking reservation: who holds it and until when.
async fn already_booked(state: &AppState, conflicting: Vec<ReservationId>) -> ApiError {
    let message = match state.booking.conflict_details(&conflicting).await {
        Ok(Some(view)) => format!(
            "Subject is already booked until {} by {}",
            view.end.format("%Y-%m-%d %H:%M:%S"),
            view.user_name
        ),
        Ok(None) => "Subject is already booked".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to load conflicting reservation");
            "Subject is already booked".to_string()
        }
    };
    ApiError::AlreadyBooked {
        message,
        conflicting,
    }
}

/// DELETE /reservations?user_id=..&subject_id=..: remove the user's current
/// and future reservations of the subject.
#[tracing::instrument(skip(state))]
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RemoveReservationsQuery>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state
        .booking
        .remove(RemoveReservations::new(
            UserId::new(query.user_id),
            SubjectId::new(query.subject_id),
        ))
        .await?;
    Ok(Json(RemovedResponse { removed }))
}

/// GET /reservations/active: reservations active at `at` (default now),
/// optionally restricted by `tags`.
#[tracing::instrument(skip(state))]
pub async fn active(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActiveQuery>,
) -> Result<Json<Vec<ReservationView>>, ApiError> {
    let tags = parse_tags(query.tags.as_deref());
    let views = match query.at {
        Some(at) => state.booking.active_reservations(at, &tags).await?,
        None => state.booking.active_now(&tags).await?,
    };
    Ok(Json(views))
}

/// GET /reservations/{id}: one reservation with subject and user names.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ReservationView>, ApiError> {
    Ok(Json(state.booking.get(ReservationId::new(id)).await?))
}
