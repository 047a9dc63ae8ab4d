use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub const NOT_FOUND_MESSAGE: &str = "Booking not found";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Outside business hours: {0}")]
    OutOfHours(String),
    #[error("Booking in the past: {0}")]
    PastBooking(String),
    #[error("No availability: {0}")]
    NoAvailability(String),
    #[error("Payment error: {0}")]
    PaymentError(String),
    #[error("Payment reversal failed: {0}")]
    PaymentReversalFailed(String),
    #[error("Payment incomplete: {0}")]
    PaymentIncomplete(String),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Ownership mismatch")]
    OwnershipMismatch,
    #[error("Late cancellation: {0}")]
    LateCancellation(String),
    #[error("Permission denied")]
    PermissionDenied,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    pub const fn code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::OutOfHours(_) => "out_of_hours",
            AppError::PastBooking(_) => "past_booking",
            AppError::NoAvailability(_) => "no_availability",
            AppError::PaymentIncomplete(_) => "payment_incomplete",
            // Indistinguishable from a missing booking on purpose.
            AppError::NotFound(_) | AppError::OwnershipMismatch => "not_found",
            AppError::LateCancellation(_) => "late_cancellation",
            AppError::PermissionDenied => "permission_denied",
            AppError::Database(_)
            | AppError::PaymentError(_)
            | AppError::PaymentReversalFailed(_)
            | AppError::InternalWithMsg(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
            AppError::InvalidArgument(msg)
            | AppError::OutOfHours(msg)
            | AppError::PastBooking(msg)
            | AppError::PaymentIncomplete(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NoAvailability(msg)
            | AppError::LateCancellation(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::OwnershipMismatch => (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE.to_string()),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action".to_string(),
            ),
            AppError::PaymentError(msg) => {
                error!("Payment gateway error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
            AppError::PaymentReversalFailed(msg) => {
                error!("Payment reversal failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
