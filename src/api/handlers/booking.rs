use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{
    parse_count, parse_date, ConfirmBookingRequest, CreateBookingRequest, LookupBookingRequest,
    RoomAvailabilityRequest,
};
use crate::api::dtos::responses::{BookingListResponse, BookingView, CreateBookingResponse, RoomAvailabilityResponse};
use crate::domain::services::reservation_service::{AvailabilityRequest, CreateReservation};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("create_booking: room {} on {} at {}", payload.room_id, payload.date, payload.start_time);

    let input = CreateReservation {
        room_id: payload.room_id.trim().to_string(),
        date: parse_date(&payload.date)?,
        start_time: payload.start_time,
        duration_hours: parse_count(payload.duration, "Duration")?,
        party_size: parse_count(payload.party_size, "Party size")?,
        customer: payload.customer_info.to_details(),
        total_cost: payload.total_cost,
        deposit_amount: payload.deposit_amount,
    };

    let created = state.reservations.create(input).await?;
    let timeline = state.reservations.timeline(&created.reservation);

    Ok((StatusCode::CREATED, Json(CreateBookingResponse {
        booking_id: created.reservation.id.clone(),
        client_secret: created.client_secret,
        booking: BookingView::new(&created.reservation, timeline),
    })))
}

pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    Json(payload): Json<ConfirmBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let confirmed = state.reservations.confirm(&booking_id, &payload.payment_reference).await?;
    Ok(Json(BookingView::new(&confirmed, state.reservations.timeline(&confirmed))))
}

pub async fn lookup_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LookupBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let found = state.reservations.lookup(payload.booking_ref.as_deref(), &payload.email).await?;
    let bookings = found.iter()
        .map(|r| BookingView::new(r, state.reservations.timeline(r)))
        .collect();
    Ok(Json(BookingListResponse { bookings }))
}

pub async fn room_availability(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RoomAvailabilityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = AvailabilityRequest {
        date: parse_date(&payload.date)?,
        start_time: payload.start_time,
        duration_hours: parse_count(payload.duration, "Duration")?,
        room_ids: payload.room_ids,
        exclude_booking_id: payload.exclude_booking_id,
    };

    let (window, availability) = state.reservations.availability(request).await?;

    Ok(Json(RoomAvailabilityResponse {
        date: window.date.format("%Y-%m-%d").to_string(),
        start_time: window.start_time,
        end_time: window.end_time,
        availability,
    }))
}
