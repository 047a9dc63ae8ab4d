use std::collections::BTreeMap;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use crate::domain::models::reservation::Reservation;
use crate::domain::services::reservation_service::BookingTimeline;

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Client-facing projection. Never carries the payment reference or
/// notification bookkeeping.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: String,
    pub room_id: String,
    pub room_name: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub duration: i32,
    pub party_size: i32,
    pub status: String,
    pub payment_status: String,
    pub total_cost: i64,
    pub deposit_amount: i64,
    pub remaining_balance: i64,
    pub base_cost: i64,
    pub extra_guest_cost: i64,
    pub required_purchase_cost: i64,
    pub customer: CustomerView,
    pub can_cancel: bool,
    pub can_rebook: bool,
    pub cancelable_until: Option<String>,
    pub start_date_time: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl BookingView {
    pub fn new(r: &Reservation, timeline: Option<BookingTimeline>) -> Self {
        let can_modify = timeline.is_some_and(|t| t.can_modify);
        Self {
            id: r.id.clone(),
            room_id: r.room_id.clone(),
            room_name: r.room_name.clone(),
            date: r.date.format("%Y-%m-%d").to_string(),
            start_time: r.start_time.clone(),
            end_time: r.end_time.clone(),
            duration: r.duration_hours,
            party_size: r.party_size,
            status: r.status.clone(),
            payment_status: r.payment_status.clone(),
            total_cost: r.total_cost,
            deposit_amount: r.deposit_amount,
            remaining_balance: r.remaining_balance,
            base_cost: r.base_cost,
            extra_guest_cost: r.extra_guest_cost,
            required_purchase_cost: r.required_purchase_cost,
            customer: CustomerView {
                first_name: r.customer_first_name.clone(),
                last_name: r.customer_last_name.clone(),
                email: r.customer_email.clone(),
                phone: r.customer_phone.clone(),
            },
            can_cancel: can_modify,
            can_rebook: can_modify,
            cancelable_until: timeline.map(|t| iso(t.cancelable_until)),
            start_date_time: timeline.map(|t| iso(t.starts_at)),
            created_at: Some(iso(r.created_at)),
            updated_at: Some(iso(r.updated_at)),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBookingView {
    #[serde(flatten)]
    pub booking: BookingView,
    pub payment_reference: Option<String>,
    pub confirmation_email_sent: bool,
    pub cancellation_email_sent: bool,
    pub sms_sent: bool,
    pub cancelled_at: Option<String>,
    pub cancelled_by: Option<String>,
}

impl AdminBookingView {
    pub fn new(r: &Reservation, timeline: Option<BookingTimeline>) -> Self {
        Self {
            booking: BookingView::new(r, timeline),
            payment_reference: r.payment_reference.clone(),
            confirmation_email_sent: r.confirmation_email_sent,
            cancellation_email_sent: r.cancellation_email_sent,
            sms_sent: r.sms_sent,
            cancelled_at: r.cancelled_at.map(iso),
            cancelled_by: r.cancelled_by.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub booking_id: String,
    pub client_secret: Option<String>,
    pub booking: BookingView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAvailabilityResponse {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub availability: BTreeMap<String, u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListResponse<T> {
    pub bookings: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use crate::domain::models::reservation::STATUS_CONFIRMED;

    fn reservation() -> Reservation {
        let created = Utc.with_ymd_and_hms(2025, 11, 1, 12, 0, 0).unwrap();
        Reservation {
            id: "r1".into(),
            room_id: "small".into(),
            room_name: "Small".into(),
            date: NaiveDate::from_ymd_opt(2025, 11, 22).unwrap(),
            start_time: "20:00".into(),
            end_time: "22:00".into(),
            duration_hours: 2,
            party_size: 4,
            customer_first_name: "Ada".into(),
            customer_last_name: "Lovelace".into(),
            customer_email: "ada@example.com".into(),
            customer_phone: "555".into(),
            status: STATUS_CONFIRMED.into(),
            payment_reference: Some("pi_secret".into()),
            payment_status: "requires_capture".into(),
            total_cost: 8000,
            deposit_amount: 2000,
            remaining_balance: 6000,
            base_cost: 8000,
            extra_guest_cost: 0,
            required_purchase_cost: 0,
            confirmation_email_sent: true,
            cancellation_email_sent: false,
            sms_sent: false,
            cancelled_at: None,
            cancelled_by: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_guest_view_hides_internal_fields() {
        let starts_at = Utc.with_ymd_and_hms(2025, 11, 23, 4, 0, 0).unwrap();
        let timeline = BookingTimeline {
            starts_at,
            cancelable_until: starts_at - Duration::hours(48),
            can_modify: true,
        };
        let json = serde_json::to_value(BookingView::new(&reservation(), Some(timeline))).unwrap();

        assert!(json.get("paymentReference").is_none());
        assert!(json.get("confirmationEmailSent").is_none());
        assert_eq!(json["canCancel"], true);
        assert_eq!(json["cancelableUntil"], "2025-11-21T04:00:00.000Z");
        assert_eq!(json["startDateTime"], "2025-11-23T04:00:00.000Z");
        assert_eq!(json["customer"]["email"], "ada@example.com");
    }

    #[test]
    fn test_admin_view_adds_bookkeeping() {
        let json = serde_json::to_value(AdminBookingView::new(&reservation(), None)).unwrap();
        assert_eq!(json["paymentReference"], "pi_secret");
        assert_eq!(json["confirmationEmailSent"], true);
        assert_eq!(json["canRebook"], false);
        assert!(json["cancelableUntil"].is_null());
        assert_eq!(json["roomId"], "small");
    }
}
