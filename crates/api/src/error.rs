//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::ReservationId;
use domain::BookingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Booking rule or storage error.
    Booking(BookingError),
    /// The subject is booked; `message` names who holds it and until when.
    AlreadyBooked {
        message: String,
        conflicting: Vec<ReservationId>,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::AlreadyBooked {
                message,
                conflicting,
            } => (
                StatusCode::CONFLICT,
                serde_json::json!({ "error": message, "conflicting": conflicting }),
            ),
            ApiError::Booking(err) => {
                let (status, msg) = booking_error_to_response(err);
                (status, serde_json::json!({ "error": msg }))
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn booking_error_to_response(err: BookingError) -> (StatusCode, String) {
    match &err {
        BookingError::NotFound { .. }
        | BookingError::NameNotFound { .. }
        | BookingError::NoActiveReservation { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        BookingError::AlreadyReserved { .. } | BookingError::DuplicateTag { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        BookingError::PastReservation { .. } | BookingError::InvalidPeriod { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        BookingError::Store(_) | BookingError::Projection(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Booking(err)
    }
}
