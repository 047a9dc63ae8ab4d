use std::fmt;
use std::str::FromStr;
use serde::Serialize;

/// Processor-side state of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    RequiresPaymentMethod,
    RequiresCapture,
    Processing,
    Succeeded,
    Canceled,
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::RequiresPaymentMethod => "requires_payment_method",
            PaymentStatus::RequiresCapture => "requires_capture",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Other(raw) => raw,
        }
    }

    /// Settlement is never assumed synchronous: an authorization still being
    /// processed or awaiting capture is enough to hold the room.
    pub fn secures_booking(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::RequiresCapture | PaymentStatus::Processing)
    }
}

impl FromStr for PaymentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "requires_payment_method" => PaymentStatus::RequiresPaymentMethod,
            "requires_capture" => PaymentStatus::RequiresCapture,
            "processing" => PaymentStatus::Processing,
            "succeeded" => PaymentStatus::Succeeded,
            "canceled" => PaymentStatus::Canceled,
            other => PaymentStatus::Other(other.to_string()),
        })
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: PaymentStatus,
    pub client_secret: Option<String>,
}
