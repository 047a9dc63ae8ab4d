use std::sync::Arc;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::json;
use tera::{Context, Tera};
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};
use crate::domain::models::reservation::{NotificationFlag, Reservation};
use crate::domain::models::venue::VenueConfig;
use crate::domain::ports::{EmailService, ReservationRepository, SmsService};
use crate::domain::services::calendar::generate_ics;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Created,
    Rescheduled,
    Cancelled,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Created => "created",
            NotificationKind::Rescheduled => "rescheduled",
            NotificationKind::Cancelled => "cancelled",
        }
    }

    const fn template(self) -> &'static str {
        match self {
            NotificationKind::Created => "confirmation.html",
            NotificationKind::Rescheduled => "reschedule.html",
            NotificationKind::Cancelled => "cancellation.html",
        }
    }

    const fn email_flag(self) -> NotificationFlag {
        match self {
            NotificationKind::Cancelled => NotificationFlag::CancellationEmail,
            _ => NotificationFlag::ConfirmationEmail,
        }
    }
}

/// Fire-and-forget email, calendar and SMS side effects of a state change.
/// Nothing here can fail the operation that triggered it.
#[derive(Clone)]
pub struct NotificationDispatcher {
    repo: Arc<dyn ReservationRepository>,
    email: Arc<dyn EmailService>,
    sms: Option<Arc<dyn SmsService>>,
    templates: Arc<Tera>,
    venue: Arc<VenueConfig>,
    venue_name: String,
    tz: Tz,
}

impl NotificationDispatcher {
    pub fn new(
        repo: Arc<dyn ReservationRepository>,
        email: Arc<dyn EmailService>,
        sms: Option<Arc<dyn SmsService>>,
        templates: Arc<Tera>,
        venue: Arc<VenueConfig>,
        venue_name: String,
        tz: Tz,
    ) -> Self {
        Self { repo, email, sms, templates, venue, venue_name, tz }
    }

    pub fn dispatch(&self, kind: NotificationKind, reservation: Reservation) -> JoinHandle<()> {
        let dispatcher = self.clone();
        let span = info_span!(
            "notification",
            booking_id = %reservation.id,
            kind = kind.as_str()
        );

        tokio::spawn(
            async move {
                dispatcher.deliver(kind, &reservation).await;
            }
            .instrument(span),
        )
    }

    async fn deliver(&self, kind: NotificationKind, reservation: &Reservation) {
        let starts_at = self.venue.local_start(self.tz, reservation.date, &reservation.start_time);

        match self.send_email(kind, reservation, starts_at).await {
            Ok(()) => self.record(reservation, kind.email_flag()).await,
            Err(e) => warn!("Email notification failed: {}", e),
        }

        let Some(sms) = &self.sms else {
            return;
        };
        if reservation.customer_phone.is_empty() {
            return;
        }
        let body = self.sms_body(kind, reservation);
        match sms.send(&reservation.customer_phone, &body).await {
            Ok(()) => self.record(reservation, NotificationFlag::Sms).await,
            Err(e) => warn!("SMS notification failed: {}", e),
        }
    }

    async fn send_email(&self, kind: NotificationKind, reservation: &Reservation, starts_at: Option<DateTime<Utc>>) -> Result<(), AppError> {
        let context = Context::from_value(json!({
            "venue_name": self.venue_name,
            "first_name": reservation.customer_first_name,
            "booking_id": reservation.id,
            "room_name": reservation.room_name,
            "date": reservation.date.format("%A, %B %-d, %Y").to_string(),
            "start_time": reservation.start_time,
            "end_time": reservation.end_time,
            "party_size": reservation.party_size,
            "total": format_cents(reservation.total_cost),
            "deposit": format_cents(reservation.deposit_amount),
            "balance": format_cents(reservation.remaining_balance),
        }))
        .map_err(|e| AppError::InternalWithMsg(format!("Template context error: {}", e)))?;

        let html = self.templates.render(kind.template(), &context)
            .map_err(|e| AppError::InternalWithMsg(format!("Template render error: {}", e)))?;

        let subject = match kind {
            NotificationKind::Created => format!("Your {} booking", self.venue_name),
            NotificationKind::Rescheduled => format!("Your {} booking has changed", self.venue_name),
            NotificationKind::Cancelled => format!("Your {} booking was cancelled", self.venue_name),
        };

        let invite = match (kind, starts_at) {
            (NotificationKind::Cancelled, _) | (_, None) => None,
            (_, Some(start)) => Some(generate_ics(&self.venue_name, reservation, start)),
        };

        self.email.send(
            &reservation.customer_email,
            &subject,
            &html,
            invite.as_ref().map(|_| "booking.ics"),
            invite.as_ref().map(|ics| ics.as_bytes()),
        ).await?;

        info!("Sent {} email", kind.as_str());
        Ok(())
    }

    fn sms_body(&self, kind: NotificationKind, reservation: &Reservation) -> String {
        match kind {
            NotificationKind::Cancelled => format!(
                "{}: your booking on {} at {} has been cancelled.",
                self.venue_name, reservation.date, reservation.start_time
            ),
            _ => format!(
                "{}: {} booked for {} at {}-{}. Ref {}.",
                self.venue_name, reservation.room_name, reservation.date,
                reservation.start_time, reservation.end_time, reservation.id
            ),
        }
    }

    async fn record(&self, reservation: &Reservation, flag: NotificationFlag) {
        if let Err(e) = self.repo.mark_notification_sent(&reservation.id, flag).await {
            warn!("Failed to record {} flag: {}", flag.column(), e);
        }
    }
}

fn format_cents(amount: i64) -> String {
    format!("{}.{:02}", amount / 100, (amount % 100).abs())
}
