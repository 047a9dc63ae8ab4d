use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};
use crate::domain::models::payment::PaymentStatus;
use crate::domain::models::reservation::{
    normalize_email, BookingWindow, CustomerDetails, NewReservationParams, Reservation,
    PAYMENT_NOT_REQUIRED, PAYMENT_REFUNDED, STATUS_CONFIRMED, STATUS_PENDING,
};
use crate::domain::models::room::RoomType;
use crate::domain::models::schedule::{format_minutes, parse_minutes, BusinessHours};
use crate::domain::models::venue::VenueConfig;
use crate::domain::ports::{Clock, PaymentGateway, ReservationRepository};
use crate::domain::services::availability::{AvailabilityEngine, DayAvailability, SlotQuery};
use crate::domain::services::notifications::{NotificationDispatcher, NotificationKind};
use crate::error::{AppError, NOT_FOUND_MESSAGE};

const INACTIVE_MESSAGE: &str = "This booking is no longer active.";

/// Who is asking for a change. Guests prove ownership with the booking email.
#[derive(Debug, Clone)]
pub enum Actor {
    Guest { email: String },
    Admin { user_id: String },
}

impl Actor {
    fn label(&self) -> String {
        match self {
            Actor::Guest { .. } => "guest".to_string(),
            Actor::Admin { user_id } => format!("admin:{}", user_id),
        }
    }
}

pub struct CreateReservation {
    pub room_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_hours: u32,
    pub party_size: u32,
    pub customer: CustomerDetails,
    pub total_cost: i64,
    pub deposit_amount: i64,
}

#[derive(Debug)]
pub struct CreatedReservation {
    pub reservation: Reservation,
    pub client_secret: Option<String>,
}

pub struct AvailabilityRequest {
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_hours: u32,
    pub room_ids: Option<Vec<String>>,
    pub exclude_booking_id: Option<String>,
}

/// New slot for an existing booking. Unset fields keep their current value.
pub struct ScheduleChange {
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_hours: u32,
    pub room_id: Option<String>,
    pub party_size: Option<u32>,
    pub customer: Option<CustomerDetails>,
    pub total_cost: Option<i64>,
}

pub struct AdminUpsert {
    pub id: Option<String>,
    pub room_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_hours: u32,
    pub party_size: u32,
    pub customer: CustomerDetails,
    pub total_cost: Option<i64>,
    pub deposit_amount: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingTimeline {
    pub starts_at: DateTime<Utc>,
    pub cancelable_until: DateTime<Utc>,
    pub can_modify: bool,
}

/// Fails with `LateCancellation` once `now` is inside the notice window.
/// Exactly `notice` before the start is still allowed.
pub fn ensure_outside_notice_window(starts_at: DateTime<Utc>, now: DateTime<Utc>, notice: Duration) -> Result<(), AppError> {
    if now > starts_at - notice {
        return Err(AppError::LateCancellation(format!(
            "Bookings cannot be changed online within {} hours of the start time. Please contact the venue directly.",
            notice.num_hours()
        )));
    }
    Ok(())
}

pub struct ReservationService {
    repo: Arc<dyn ReservationRepository>,
    payments: Arc<dyn PaymentGateway>,
    notifier: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    engine: AvailabilityEngine,
    venue: Arc<VenueConfig>,
    tz: Tz,
    currency: String,
}

impl ReservationService {
    pub fn new(
        repo: Arc<dyn ReservationRepository>,
        payments: Arc<dyn PaymentGateway>,
        notifier: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        venue: Arc<VenueConfig>,
        tz: Tz,
        currency: String,
    ) -> Self {
        let engine = AvailabilityEngine::new(venue.clone());
        Self { repo, payments, notifier, clock, engine, venue, tz, currency }
    }

    pub fn notice_window(&self) -> Duration {
        Duration::hours(self.venue.notice_window_hours)
    }

    /// Validates duration, hours and "not in the past" for a requested window.
    pub fn resolve_window(&self, date: NaiveDate, start_time: &str, duration_hours: u32) -> Result<BookingWindow, AppError> {
        let max = self.venue.max_duration_hours;
        if duration_hours == 0 || duration_hours > max {
            return Err(AppError::InvalidArgument(format!("Duration must be between 1 and {} hours.", max)));
        }

        let start_minute = parse_minutes(start_time)
            .ok_or_else(|| AppError::InvalidArgument("Start time must be in HH:MM format.".into()))?;
        let start_time = format_minutes(start_minute);

        let hours = self.venue.schedule.hours_on(date)
            .ok_or_else(|| AppError::OutOfHours("The venue is closed on that day.".into()))?;
        let end_time = BusinessHours::end_time(&start_time, duration_hours)
            .ok_or_else(|| AppError::InvalidArgument("Start time must be in HH:MM format.".into()))?;
        hours.ensure_within(&start_time, &end_time)?;

        let starts_at = self.venue.local_start(self.tz, date, &start_time)
            .ok_or_else(|| AppError::InvalidArgument("That start time does not exist on the selected date.".into()))?;
        if starts_at < self.clock.now() {
            return Err(AppError::PastBooking("Bookings cannot start in the past.".into()));
        }

        Ok(BookingWindow { date, start_time, end_time, duration_hours, starts_at })
    }

    pub fn timeline(&self, reservation: &Reservation) -> Option<BookingTimeline> {
        let starts_at = self.venue.local_start(self.tz, reservation.date, &reservation.start_time)?;
        let cancelable_until = starts_at - self.notice_window();
        let now = self.clock.now();
        Some(BookingTimeline {
            starts_at,
            cancelable_until,
            can_modify: reservation.is_active() && now < starts_at && now <= cancelable_until,
        })
    }

    pub async fn create(&self, input: CreateReservation) -> Result<CreatedReservation, AppError> {
        let room = self.known_room(&input.room_id)?;
        validate_customer(&input.customer)?;
        let window = self.resolve_window(input.date, &input.start_time, input.duration_hours)?;
        ensure_party_fits(&room, input.party_size)?;

        let quote = room.quote(input.party_size, input.duration_hours);
        if input.total_cost != quote.total {
            return Err(AppError::InvalidArgument("Total cost does not match the current price for this room.".into()));
        }
        if input.deposit_amount < 0 || input.deposit_amount > quote.total {
            return Err(AppError::InvalidArgument("Deposit must be between zero and the total cost.".into()));
        }

        let query = SlotQuery {
            room_id: room.id.clone(),
            date: window.date,
            start_time: window.start_time.clone(),
            end_time: window.end_time.clone(),
            exclude_id: None,
        };
        if self.engine.compute_remaining_units(self.repo.as_ref(), &query).await? == 0 {
            return Err(AppError::NoAvailability(room.unavailable_message()));
        }

        let (payment_reference, payment_status, client_secret) = if input.deposit_amount > 0 {
            let metadata = [
                ("room_id", room.id.clone()),
                ("date", window.date.to_string()),
                ("start_time", window.start_time.clone()),
                ("customer_email", input.customer.email.clone()),
            ];
            let intent = self.payments.authorize(input.deposit_amount, &self.currency, &metadata).await?;
            (Some(intent.id), intent.status.as_str().to_string(), intent.client_secret)
        } else {
            (None, PAYMENT_NOT_REQUIRED.to_string(), None)
        };

        let status = if payment_reference.is_some() { STATUS_PENDING } else { STATUS_CONFIRMED };
        let reservation = Reservation::new(NewReservationParams {
            room: room.clone(),
            window,
            party_size: input.party_size,
            customer: input.customer,
            quote,
            total_cost: quote.total,
            deposit_amount: input.deposit_amount,
            status,
            payment_reference: payment_reference.clone(),
            payment_status,
            now: self.clock.now(),
        });

        let saved = match self.repo.insert_if_available(&reservation, &self.engine).await {
            Ok(saved) => saved,
            Err(e) => {
                if let Some(reference) = payment_reference {
                    self.void_authorization(&reference).await;
                }
                return Err(e);
            }
        };

        info!(booking_id = %saved.id, room_id = %saved.room_id, date = %saved.date, "Booking created");
        self.notifier.dispatch(NotificationKind::Created, saved.clone());

        Ok(CreatedReservation { reservation: saved, client_secret })
    }

    /// Compensation for a failed insert. Errors are logged only.
    async fn void_authorization(&self, reference: &str) {
        match self.payments.cancel_authorization(reference).await {
            Ok(()) => info!(payment_reference = %reference, "Voided authorization after failed booking"),
            Err(e) => error!(payment_reference = %reference, "Failed to void authorization: {}", e),
        }
    }

    pub async fn confirm(&self, id: &str, payment_reference: &str) -> Result<Reservation, AppError> {
        let reservation = self.load(id).await?;
        if !reservation.is_active() {
            return Err(AppError::InvalidArgument(INACTIVE_MESSAGE.into()));
        }

        let Some(stored) = reservation.payment_reference.as_deref() else {
            // Nothing to pay for; already confirmed at creation.
            return Ok(reservation);
        };
        if stored != payment_reference.trim() {
            return Err(AppError::InvalidArgument("Payment reference does not match this booking.".into()));
        }

        let status = self.payments.retrieve(stored).await?;
        if !status.secures_booking() {
            return Err(AppError::PaymentIncomplete(format!(
                "Payment has not been completed (status: {}).",
                status
            )));
        }

        let confirmed = self.repo.mark_confirmed(id, status.as_str(), self.clock.now()).await?
            .ok_or_else(|| AppError::InvalidArgument(INACTIVE_MESSAGE.into()))?;
        info!(booking_id = %id, payment_status = %status, "Booking confirmed");
        Ok(confirmed)
    }

    pub async fn lookup(&self, booking_ref: Option<&str>, email: &str) -> Result<Vec<Reservation>, AppError> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(AppError::InvalidArgument("A valid email address is required.".into()));
        }

        match booking_ref.map(str::trim).filter(|r| !r.is_empty()) {
            Some(id) => Ok(self.repo.find_by_id(id).await?
                .filter(|r| r.owned_by(&email))
                .into_iter()
                .collect()),
            None => self.repo.list_by_email(&email).await,
        }
    }

    /// Remaining units per room for one window, with the window as validated.
    pub async fn availability(&self, request: AvailabilityRequest) -> Result<(BookingWindow, BTreeMap<String, u32>), AppError> {
        let window = self.resolve_window(request.date, &request.start_time, request.duration_hours)?;

        let room_ids = match request.room_ids {
            Some(ids) if !ids.is_empty() => ids,
            _ => self.venue.rooms.all().iter().map(|r| r.id.clone()).collect(),
        };

        let mut remaining = BTreeMap::new();
        for room_id in room_ids {
            let query = SlotQuery {
                room_id: room_id.clone(),
                date: window.date,
                start_time: window.start_time.clone(),
                end_time: window.end_time.clone(),
                exclude_id: request.exclude_booking_id.clone(),
            };
            let units = self.engine.compute_remaining_units(self.repo.as_ref(), &query).await?;
            remaining.insert(room_id, units);
        }
        Ok((window, remaining))
    }

    pub async fn cancel(&self, id: &str, actor: &Actor) -> Result<Reservation, AppError> {
        let reservation = self.load(id).await?;

        match actor {
            Actor::Guest { .. } => self.ensure_may_change(&reservation, actor)?,
            Actor::Admin { .. } if !reservation.is_active() => return Ok(reservation),
            Actor::Admin { .. } => {}
        }

        self.reverse_payment(&reservation).await?;

        let payment_status = if reservation.payment_reference.is_some() {
            PAYMENT_REFUNDED
        } else {
            reservation.payment_status.as_str()
        };

        let marked = self.repo.mark_cancelled(id, &actor.label(), payment_status, self.clock.now()).await;
        let marked = match marked {
            Ok(marked) => marked,
            Err(e) => {
                // The processor side is already reversed at this point.
                error!(
                    booking_id = %id,
                    payment_reference = reservation.payment_reference.as_deref().unwrap_or(""),
                    error = %e,
                    "Payment reversed but booking could not be marked cancelled"
                );
                return Err(e);
            }
        };

        match marked {
            Some(cancelled) => {
                info!(booking_id = %id, cancelled_by = %actor.label(), "Booking cancelled");
                self.notifier.dispatch(NotificationKind::Cancelled, cancelled.clone());
                Ok(cancelled)
            }
            // Lost a race with another cancellation.
            None => self.load(id).await,
        }
    }

    async fn reverse_payment(&self, reservation: &Reservation) -> Result<(), AppError> {
        let Some(reference) = reservation.payment_reference.as_deref() else {
            return Ok(());
        };

        let status = self.payments.retrieve(reference).await.map_err(reversal_failed)?;
        let result = match status {
            PaymentStatus::Canceled => Ok(()),
            PaymentStatus::Succeeded => self.payments.refund(reference).await,
            _ => self.payments.cancel_authorization(reference).await,
        };

        result.map_err(|e| {
            error!(booking_id = %reservation.id, payment_reference = %reference, "Payment reversal failed: {}", e);
            reversal_failed(e)
        })
    }

    pub async fn reschedule(&self, id: &str, actor: &Actor, change: ScheduleChange) -> Result<Reservation, AppError> {
        let current = self.load(id).await?;
        self.ensure_may_change(&current, actor)?;
        self.apply_change(&current, actor, change).await
    }

    async fn apply_change(&self, current: &Reservation, actor: &Actor, change: ScheduleChange) -> Result<Reservation, AppError> {
        let room = self.known_room(change.room_id.as_deref().unwrap_or(&current.room_id))?;
        let window = self.resolve_window(change.date, &change.start_time, change.duration_hours)?;
        let party_size = change.party_size.unwrap_or(current.party_size.max(0) as u32);
        ensure_party_fits(&room, party_size)?;
        if let Some(customer) = &change.customer {
            validate_customer(customer)?;
        }

        let quote = room.quote(party_size, change.duration_hours);
        // Only admins may override the quoted price.
        let total_cost = match (actor, change.total_cost) {
            (Actor::Admin { .. }, Some(total)) if total >= 0 => total,
            (Actor::Admin { .. }, Some(_)) => {
                return Err(AppError::InvalidArgument("Total cost cannot be negative.".into()));
            }
            (Actor::Guest { .. }, Some(total)) if total != quote.total => {
                return Err(AppError::InvalidArgument("Total cost does not match the current price for this room.".into()));
            }
            _ => quote.total,
        };
        let now = self.clock.now();

        let apply = |existing: &Reservation| -> Result<Reservation, AppError> {
            self.ensure_may_change(existing, actor)?;
            let mut updated = existing.clone();
            updated.apply_schedule(&room, &window, party_size, &quote, total_cost);
            if let Some(customer) = &change.customer {
                updated.apply_customer(customer);
            }
            updated.updated_at = now;
            Ok(updated)
        };

        let updated = self.repo
            .reschedule_if_available(&current.id, &room.id, window.date, &self.engine, &apply)
            .await?;

        info!(
            booking_id = %updated.id,
            room_id = %updated.room_id,
            date = %updated.date,
            start_time = %updated.start_time,
            "Booking rescheduled"
        );
        self.notifier.dispatch(NotificationKind::Rescheduled, updated.clone());
        Ok(updated)
    }

    /// Ownership, then status, then notice window. Admins skip ownership and notice.
    fn ensure_may_change(&self, reservation: &Reservation, actor: &Actor) -> Result<(), AppError> {
        if let Actor::Guest { email } = actor
            && !reservation.owned_by(email) {
            return Err(AppError::OwnershipMismatch);
        }
        if !reservation.is_active() {
            return Err(AppError::InvalidArgument(INACTIVE_MESSAGE.into()));
        }
        if let Actor::Guest { .. } = actor {
            let starts_at = self.venue.local_start(self.tz, reservation.date, &reservation.start_time)
                .ok_or_else(|| AppError::InternalWithMsg(format!("Booking {} has an unreadable start time", reservation.id)))?;
            ensure_outside_notice_window(starts_at, self.clock.now(), self.notice_window())?;
        }
        Ok(())
    }

    /// Creates a confirmed, unpaid booking or moves an existing one.
    pub async fn admin_upsert(&self, actor: &Actor, input: AdminUpsert) -> Result<Reservation, AppError> {
        if let Some(id) = input.id.as_deref() {
            let current = self.load(id).await?;
            let change = ScheduleChange {
                date: input.date,
                start_time: input.start_time,
                duration_hours: input.duration_hours,
                room_id: Some(input.room_id),
                party_size: Some(input.party_size),
                customer: Some(input.customer),
                total_cost: input.total_cost,
            };
            return self.apply_change(&current, actor, change).await;
        }

        let room = self.known_room(&input.room_id)?;
        validate_customer(&input.customer)?;
        let window = self.resolve_window(input.date, &input.start_time, input.duration_hours)?;
        ensure_party_fits(&room, input.party_size)?;

        let quote = room.quote(input.party_size, input.duration_hours);
        let total_cost = input.total_cost.unwrap_or(quote.total);
        let deposit_amount = input.deposit_amount.unwrap_or(0);
        if total_cost < 0 || deposit_amount < 0 || deposit_amount > total_cost {
            return Err(AppError::InvalidArgument("Deposit must be between zero and the total cost.".into()));
        }

        let reservation = Reservation::new(NewReservationParams {
            room,
            window,
            party_size: input.party_size,
            customer: input.customer,
            quote,
            total_cost,
            deposit_amount,
            status: STATUS_CONFIRMED,
            payment_reference: None,
            payment_status: PAYMENT_NOT_REQUIRED.to_string(),
            now: self.clock.now(),
        });

        let saved = self.repo.insert_if_available(&reservation, &self.engine).await?;
        info!(booking_id = %saved.id, created_by = %actor.label(), "Admin booking created");
        self.notifier.dispatch(NotificationKind::Created, saved.clone());
        Ok(saved)
    }

    /// All bookings of a business day in service order.
    pub async fn bookings_by_date(&self, date: NaiveDate) -> Result<Vec<Reservation>, AppError> {
        let mut bookings = self.repo.list_by_date(date).await?;
        let hours = self.venue.schedule.hours_on(date).copied();
        bookings.sort_by_key(|r| {
            let minute = match &hours {
                Some(h) => h.to_relative(&r.start_time),
                None => parse_minutes(&r.start_time),
            };
            (minute.unwrap_or(u32::MAX), r.room_id.clone(), r.created_at)
        });
        Ok(bookings)
    }

    pub async fn availability_by_date(&self, date: NaiveDate) -> Result<DayAvailability, AppError> {
        let bookings = self.repo.list_by_date(date).await?;
        Ok(self.engine.day_grid(date, &bookings))
    }

    pub async fn capture(&self, id: &str) -> Result<Reservation, AppError> {
        let reservation = self.load(id).await?;
        if !reservation.is_active() {
            return Err(AppError::InvalidArgument(INACTIVE_MESSAGE.into()));
        }
        let reference = reservation.payment_reference.as_deref()
            .ok_or_else(|| AppError::InvalidArgument("This booking has no payment to capture.".into()))?;

        let status = self.payments.capture(reference).await?;
        if status != PaymentStatus::Succeeded {
            warn!(booking_id = %id, payment_status = %status, "Capture did not settle immediately");
        }
        self.repo.update_payment_status(id, status.as_str(), self.clock.now()).await
    }

    async fn load(&self, id: &str) -> Result<Reservation, AppError> {
        self.repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.into()))
    }

    fn known_room(&self, room_id: &str) -> Result<RoomType, AppError> {
        self.venue.rooms.find(room_id).cloned()
            .ok_or_else(|| AppError::InvalidArgument(format!("Unknown room type: {}", room_id)))
    }
}

fn reversal_failed(e: AppError) -> AppError {
    AppError::PaymentReversalFailed(e.to_string())
}

fn ensure_party_fits(room: &RoomType, party_size: u32) -> Result<(), AppError> {
    if !room.accepts_party(party_size) {
        return Err(AppError::InvalidArgument(format!(
            "{} rooms hold {} to {} guests.",
            room.display_label, room.min_party_size, room.max_party_size
        )));
    }
    Ok(())
}

fn validate_customer(customer: &CustomerDetails) -> Result<(), AppError> {
    if customer.first_name.is_empty() || customer.last_name.is_empty() {
        return Err(AppError::InvalidArgument("First and last name are required.".into()));
    }
    if !customer.email.contains('@') {
        return Err(AppError::InvalidArgument("A valid email address is required.".into()));
    }
    Ok(())
}
