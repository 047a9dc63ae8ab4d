use axum::{
    body::Body,
    extract::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{admin, booking, booking_management, health};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Public Booking Flow
        .route("/api/v1/availability", post(booking::room_availability))
        .route("/api/v1/bookings", post(booking::create_booking))
        .route("/api/v1/bookings/lookup", post(booking::lookup_booking))
        .route("/api/v1/bookings/{booking_id}/confirm", post(booking::confirm_booking))

        // Guest Booking Management
        .route("/api/v1/bookings/{booking_id}/cancel", post(booking_management::cancel_booking))
        .route("/api/v1/bookings/{booking_id}/rebook", post(booking_management::rebook_booking))

        // Admin
        .route("/api/v1/admin/bookings", get(admin::list_bookings_by_date).post(admin::upsert_booking))
        .route("/api/v1/admin/bookings/{booking_id}/cancel", post(admin::cancel_booking))
        .route("/api/v1/admin/bookings/{booking_id}/rebook", post(admin::rebook_booking))
        .route("/api/v1/admin/bookings/{booking_id}/capture", post(admin::capture_payment))
        .route("/api/v1/admin/availability", get(admin::availability_by_date))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        caller_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
