use chrono::NaiveDate;
use serde::Deserialize;
use crate::domain::models::reservation::CustomerDetails;
use crate::error::AppError;

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidArgument("Date must be in YYYY-MM-DD format.".into()))
}

/// Counts arrive as plain JSON numbers; negatives are a caller error, not a 422.
pub fn parse_count(value: i64, field: &str) -> Result<u32, AppError> {
    u32::try_from(value).map_err(|_| AppError::InvalidArgument(format!("{} must be a positive number.", field)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl CustomerInfo {
    pub fn to_details(&self) -> CustomerDetails {
        CustomerDetails::new(&self.first_name, &self.last_name, &self.email, &self.phone)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub room_id: String,
    pub date: String,
    pub start_time: String,
    pub duration: i64,
    pub party_size: i64,
    pub total_cost: i64,
    pub deposit_amount: i64,
    pub customer_info: CustomerInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBookingRequest {
    #[serde(alias = "paymentIntentId")]
    pub payment_reference: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupBookingRequest {
    pub booking_ref: Option<String>,
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAvailabilityRequest {
    pub date: String,
    pub start_time: String,
    pub duration: i64,
    pub room_ids: Option<Vec<String>>,
    pub exclude_booking_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCancelRequest {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestRebookRequest {
    pub email: String,
    pub new_date: String,
    pub new_start_time: String,
    pub new_duration: i64,
    pub room_id: Option<String>,
    pub party_size: Option<i64>,
    pub total_cost: Option<i64>,
    pub customer_info: Option<CustomerInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRebookRequest {
    pub new_date: String,
    pub new_start_time: String,
    pub new_duration: i64,
    pub room_id: Option<String>,
    pub party_size: Option<i64>,
    pub total_cost: Option<i64>,
    pub customer_info: Option<CustomerInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpsertRequest {
    pub booking_id: Option<String>,
    pub room_id: String,
    pub date: String,
    pub start_time: String,
    pub duration: i64,
    pub party_size: i64,
    pub customer_info: CustomerInfo,
    pub total_cost: Option<i64>,
    pub deposit_amount: Option<i64>,
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_and_counts() {
        assert_eq!(parse_date(" 2025-11-22 ").unwrap(), NaiveDate::from_ymd_opt(2025, 11, 22).unwrap());
        assert!(matches!(parse_date("22/11/2025"), Err(AppError::InvalidArgument(_))));
        assert_eq!(parse_count(3, "duration").unwrap(), 3);
        assert!(parse_count(-1, "duration").is_err());
    }

    #[test]
    fn test_confirm_accepts_intent_alias() {
        let req: ConfirmBookingRequest = serde_json::from_str(r#"{"paymentIntentId":"pi_1"}"#).unwrap();
        assert_eq!(req.payment_reference, "pi_1");
    }
}
