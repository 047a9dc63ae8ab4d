use axum::{extract::{State, Path}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{parse_count, parse_date, GuestCancelRequest, GuestRebookRequest};
use crate::api::dtos::responses::BookingView;
use crate::domain::services::reservation_service::{Actor, ScheduleChange};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    Json(payload): Json<GuestCancelRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::Guest { email: payload.email };
    let cancelled = state.reservations.cancel(&booking_id, &actor).await?;
    info!("Booking cancelled by guest: {}", booking_id);

    Ok(Json(BookingView::new(&cancelled, state.reservations.timeline(&cancelled))))
}

pub async fn rebook_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    Json(payload): Json<GuestRebookRequest>,
) -> Result<impl IntoResponse, AppError> {
    let change = ScheduleChange {
        date: parse_date(&payload.new_date)?,
        start_time: payload.new_start_time,
        duration_hours: parse_count(payload.new_duration, "Duration")?,
        room_id: payload.room_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()),
        party_size: payload.party_size.map(|p| parse_count(p, "Party size")).transpose()?,
        customer: payload.customer_info.as_ref().map(|c| c.to_details()),
        total_cost: payload.total_cost,
    };

    let actor = Actor::Guest { email: payload.email };
    let updated = state.reservations.reschedule(&booking_id, &actor, change).await?;

    Ok(Json(BookingView::new(&updated, state.reservations.timeline(&updated))))
}
