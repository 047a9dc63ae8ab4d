use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use crate::domain::models::room::{PriceQuote, RoomType};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_CANCELLED: &str = "cancelled";

pub const PAYMENT_NOT_REQUIRED: &str = "not_required";
pub const PAYMENT_REFUNDED: &str = "refunded";

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Reservation {
    pub id: String,
    pub room_id: String,
    pub room_name: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub duration_hours: i32,
    pub party_size: i32,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub status: String,
    pub payment_reference: Option<String>,
    pub payment_status: String,
    pub total_cost: i64,
    pub deposit_amount: i64,
    pub remaining_balance: i64,
    pub base_cost: i64,
    pub extra_guest_cost: i64,
    pub required_purchase_cost: i64,
    pub confirmation_email_sent: bool,
    pub cancellation_email_sent: bool,
    pub sms_sent: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerDetails {
    pub fn new(first_name: &str, last_name: &str, email: &str, phone: &str) -> Self {
        Self {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: normalize_email(email),
            phone: phone.trim().to_string(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A validated booking window on a business day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingWindow {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub duration_hours: u32,
    pub starts_at: DateTime<Utc>,
}

pub struct NewReservationParams {
    pub room: RoomType,
    pub window: BookingWindow,
    pub party_size: u32,
    pub customer: CustomerDetails,
    pub quote: PriceQuote,
    pub total_cost: i64,
    pub deposit_amount: i64,
    pub status: &'static str,
    pub payment_reference: Option<String>,
    pub payment_status: String,
    pub now: DateTime<Utc>,
}

impl Reservation {
    pub fn new(params: NewReservationParams) -> Self {
        let mut reservation = Self {
            id: Uuid::new_v4().to_string(),
            room_id: String::new(),
            room_name: String::new(),
            date: params.window.date,
            start_time: String::new(),
            end_time: String::new(),
            duration_hours: 0,
            party_size: 0,
            customer_first_name: String::new(),
            customer_last_name: String::new(),
            customer_email: String::new(),
            customer_phone: String::new(),
            status: params.status.to_string(),
            payment_reference: params.payment_reference,
            payment_status: params.payment_status,
            total_cost: 0,
            deposit_amount: params.deposit_amount,
            remaining_balance: 0,
            base_cost: 0,
            extra_guest_cost: 0,
            required_purchase_cost: 0,
            confirmation_email_sent: false,
            cancellation_email_sent: false,
            sms_sent: false,
            cancelled_at: None,
            cancelled_by: None,
            created_at: params.now,
            updated_at: params.now,
        };
        reservation.apply_schedule(&params.room, &params.window, params.party_size, &params.quote, params.total_cost);
        reservation.apply_customer(&params.customer);
        reservation
    }

    pub fn is_active(&self) -> bool {
        self.status == STATUS_PENDING || self.status == STATUS_CONFIRMED
    }

    pub fn owned_by(&self, email: &str) -> bool {
        normalize_email(&self.customer_email) == normalize_email(email)
    }

    /// Moves the booking to a new room/window and reprices it. The deposit is kept;
    /// `end_time` always follows from start and duration.
    pub fn apply_schedule(&mut self, room: &RoomType, window: &BookingWindow, party_size: u32, quote: &PriceQuote, total_cost: i64) {
        self.room_id = room.id.clone();
        self.room_name = room.display_label.clone();
        self.date = window.date;
        self.start_time = window.start_time.clone();
        self.end_time = window.end_time.clone();
        self.duration_hours = window.duration_hours as i32;
        self.party_size = party_size as i32;
        self.base_cost = quote.base_cost;
        self.extra_guest_cost = quote.extra_guest_cost;
        self.required_purchase_cost = quote.required_purchase_cost;
        self.total_cost = total_cost;
        self.remaining_balance = (total_cost - self.deposit_amount).max(0);
    }

    pub fn apply_customer(&mut self, customer: &CustomerDetails) {
        self.customer_first_name = customer.first_name.clone();
        self.customer_last_name = customer.last_name.clone();
        self.customer_email = customer.email.clone();
        self.customer_phone = customer.phone.clone();
    }

    pub fn customer(&self) -> CustomerDetails {
        CustomerDetails {
            first_name: self.customer_first_name.clone(),
            last_name: self.customer_last_name.clone(),
            email: self.customer_email.clone(),
            phone: self.customer_phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationFlag {
    ConfirmationEmail,
    CancellationEmail,
    Sms,
}

impl NotificationFlag {
    pub const fn column(self) -> &'static str {
        match self {
            NotificationFlag::ConfirmationEmail => "confirmation_email_sent",
            NotificationFlag::CancellationEmail => "cancellation_email_sent",
            NotificationFlag::Sms => "sms_sent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::room::RoomRegistry;

    fn sample() -> Reservation {
        let room = RoomRegistry::default().get("medium");
        let window = BookingWindow {
            date: NaiveDate::from_ymd_opt(2025, 11, 18).unwrap(),
            start_time: "23:00".into(),
            end_time: "02:00".into(),
            duration_hours: 3,
            starts_at: Utc::now(),
        };
        let quote = room.quote(6, 3);
        Reservation::new(NewReservationParams {
            room,
            window,
            party_size: 6,
            customer: CustomerDetails::new(" Ada ", "Lovelace", "  Ada@Example.COM ", " 555-0100 "),
            quote,
            total_cost: quote.total,
            deposit_amount: 5000,
            status: STATUS_PENDING,
            payment_reference: Some("pi_123".into()),
            payment_status: "requires_payment_method".into(),
            now: Utc::now(),
        })
    }

    #[test]
    fn test_new_reservation_normalizes_customer_and_prices() {
        let r = sample();
        assert_eq!(r.customer_email, "ada@example.com");
        assert_eq!(r.customer_first_name, "Ada");
        assert_eq!(r.customer_phone, "555-0100");
        assert_eq!(r.total_cost, 18000);
        assert_eq!(r.remaining_balance, 13000);
        assert_eq!(r.end_time, "02:00");
        assert!(r.is_active());
    }

    #[test]
    fn test_ownership_ignores_case_and_whitespace() {
        let r = sample();
        assert!(r.owned_by("ADA@example.com"));
        assert!(r.owned_by(" ada@example.com "));
        assert!(!r.owned_by("bob@example.com"));
    }
}
