use crate::domain::models::{
    payment::{PaymentIntent, PaymentStatus},
    reservation::{NotificationFlag, Reservation},
};
use crate::domain::services::availability::AvailabilityEngine;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Builds the replacement row from the current one inside a reschedule
/// transaction. May run more than once; must not have side effects.
pub type RescheduleFn<'a> = dyn Fn(&Reservation) -> Result<Reservation, AppError> + Send + Sync + 'a;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Reservation>, AppError>;
    async fn list_by_email(&self, email: &str) -> Result<Vec<Reservation>, AppError>;
    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Reservation>, AppError>;
    async fn list_active(&self, room_id: &str, date: NaiveDate) -> Result<Vec<Reservation>, AppError>;

    /// Inserts `reservation` only if the engine, re-run against the
    /// transaction's own read, still finds a free unit.
    async fn insert_if_available(&self, reservation: &Reservation, engine: &AvailabilityEngine) -> Result<Reservation, AppError>;

    /// Reloads `id`, applies `apply` and writes the result in place if the new
    /// window still has capacity (the booking itself excluded). `room_id` and
    /// `date` name the target slot and must match what `apply` returns.
    async fn reschedule_if_available(
        &self,
        id: &str,
        room_id: &str,
        date: NaiveDate,
        engine: &AvailabilityEngine,
        apply: &RescheduleFn<'_>,
    ) -> Result<Reservation, AppError>;

    /// Cancels an active booking. `None` if it was not active anymore.
    async fn mark_cancelled(&self, id: &str, cancelled_by: &str, payment_status: &str, at: DateTime<Utc>) -> Result<Option<Reservation>, AppError>;
    /// Promotes an active booking to confirmed. `None` if it was cancelled meanwhile.
    async fn mark_confirmed(&self, id: &str, payment_status: &str, at: DateTime<Utc>) -> Result<Option<Reservation>, AppError>;
    async fn update_payment_status(&self, id: &str, payment_status: &str, at: DateTime<Utc>) -> Result<Reservation, AppError>;
    async fn mark_notification_sent(&self, id: &str, flag: NotificationFlag) -> Result<(), AppError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Places a manual-capture hold for `amount` minor units.
    async fn authorize(&self, amount: i64, currency: &str, metadata: &[(&str, String)]) -> Result<PaymentIntent, AppError>;
    async fn retrieve(&self, id: &str) -> Result<PaymentStatus, AppError>;
    async fn capture(&self, id: &str) -> Result<PaymentStatus, AppError>;
    async fn cancel_authorization(&self, id: &str) -> Result<(), AppError>;
    async fn refund(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str, attachment_name: Option<&str>, attachment_data: Option<&[u8]>) -> Result<(), AppError>;
}

#[async_trait]
pub trait SmsService: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), AppError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
