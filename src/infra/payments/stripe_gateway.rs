use crate::domain::models::payment::{PaymentIntent, PaymentStatus};
use crate::domain::ports::PaymentGateway;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

pub struct StripePaymentGateway {
    client: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct IntentResponse {
    id: String,
    status: String,
    client_secret: Option<String>,
}

impl IntentResponse {
    fn payment_status(&self) -> PaymentStatus {
        let Ok(status) = self.status.parse::<PaymentStatus>();
        status
    }
}

impl StripePaymentGateway {
    pub fn new(api_base: String, secret_key: String) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    async fn execute(&self, request: RequestBuilder, action: &str) -> Result<IntentResponse, AppError> {
        let res = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Payment processor connection error during {}: {}", action, e);
                error!("{}", msg);
                AppError::PaymentError(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Payment processor rejected {}. Status: {}, Body: {}", action, status, text);
            error!("{}", msg);
            return Err(AppError::PaymentError(msg));
        }

        res.json::<IntentResponse>().await.map_err(|e| {
            AppError::PaymentError(format!("Unreadable payment processor response during {}: {}", action, e))
        })
    }
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    async fn authorize(&self, amount: i64, currency: &str, metadata: &[(&str, String)]) -> Result<PaymentIntent, AppError> {
        let mut form = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.to_string()),
            ("capture_method".to_string(), "manual".to_string()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        form.extend(metadata.iter().map(|(key, value)| (format!("metadata[{}]", key), value.clone())));

        let request = self.client.post(self.url("payment_intents"))
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(&form);
        let intent = self.execute(request, "authorize").await?;

        info!(payment_reference = %intent.id, amount, "Deposit authorization created");
        Ok(PaymentIntent {
            status: intent.payment_status(),
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    async fn retrieve(&self, id: &str) -> Result<PaymentStatus, AppError> {
        let request = self.client.get(self.url(&format!("payment_intents/{}", id)));
        let intent = self.execute(request, "retrieve").await?;
        Ok(intent.payment_status())
    }

    async fn capture(&self, id: &str) -> Result<PaymentStatus, AppError> {
        let request = self.client.post(self.url(&format!("payment_intents/{}/capture", id)));
        let intent = self.execute(request, "capture").await?;
        Ok(intent.payment_status())
    }

    async fn cancel_authorization(&self, id: &str) -> Result<(), AppError> {
        let request = self.client.post(self.url(&format!("payment_intents/{}/cancel", id)));
        self.execute(request, "cancel").await?;
        Ok(())
    }

    async fn refund(&self, id: &str) -> Result<(), AppError> {
        let request = self.client.post(self.url("refunds"))
            .form(&[("payment_intent", id)]);
        // Refund objects share the id/status shape closely enough.
        self.execute(request, "refund").await?;
        Ok(())
    }
}
