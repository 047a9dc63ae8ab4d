use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AdminUser;
use crate::api::dtos::requests::{parse_count, parse_date, AdminRebookRequest, AdminUpsertRequest, DateQuery};
use crate::api::dtos::responses::{AdminBookingView, BookingListResponse};
use crate::domain::models::reservation::Reservation;
use crate::domain::services::reservation_service::{Actor, AdminUpsert, ScheduleChange};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

fn admin_view(state: &AppState, reservation: &Reservation) -> AdminBookingView {
    AdminBookingView::new(reservation, state.reservations.timeline(reservation))
}

pub async fn list_bookings_by_date(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_date(&query.date)?;
    let bookings = state.reservations.bookings_by_date(date).await?;
    info!("Admin {} listed {} bookings for {}", admin.user_id, bookings.len(), date);

    Ok(Json(BookingListResponse {
        bookings: bookings.iter().map(|r| admin_view(&state, r)).collect(),
    }))
}

pub async fn availability_by_date(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_date(&query.date)?;
    let grid = state.reservations.availability_by_date(date).await?;
    Ok(Json(grid))
}

pub async fn upsert_booking(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdminUpsertRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = AdminUpsert {
        id: payload.booking_id.filter(|id| !id.trim().is_empty()),
        room_id: payload.room_id.trim().to_string(),
        date: parse_date(&payload.date)?,
        start_time: payload.start_time,
        duration_hours: parse_count(payload.duration, "Duration")?,
        party_size: parse_count(payload.party_size, "Party size")?,
        customer: payload.customer_info.to_details(),
        total_cost: payload.total_cost,
        deposit_amount: payload.deposit_amount,
    };

    let actor = Actor::Admin { user_id: admin.user_id };
    let saved = state.reservations.admin_upsert(&actor, input).await?;
    Ok(Json(admin_view(&state, &saved)))
}

pub async fn cancel_booking(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let actor = Actor::Admin { user_id: admin.user_id };
    let cancelled = state.reservations.cancel(&booking_id, &actor).await?;
    Ok(Json(admin_view(&state, &cancelled)))
}

pub async fn rebook_booking(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    Json(payload): Json<AdminRebookRequest>,
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

    let actor = Actor::Admin { user_id: admin.user_id };
    let updated = state.reservations.reschedule(&booking_id, &actor, change).await?;
    Ok(Json(admin_view(&state, &updated)))
}

pub async fn capture_payment(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let captured = state.reservations.capture(&booking_id).await?;
    info!("Admin {} captured payment for {}", admin.user_id, booking_id);
    Ok(Json(admin_view(&state, &captured)))
}
