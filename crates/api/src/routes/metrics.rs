//! Prometheus scrape endpoint for the booking counters and timings.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::PrometheusHandle;

/// Prometheus text exposition format.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics: renders `reservations_*`, `subjects_created_total` and
/// `booking_create_duration_seconds` in exposition format.
pub async fn get(State(handle): State<PrometheusHandle>) -> Response {
    ([(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], handle.render()).into_response()
}
