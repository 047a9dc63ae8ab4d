use crate::domain::ports::SmsService;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use tracing::error;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub struct TwilioSmsService {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSmsService {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            client: Client::new(),
            account_sid,
            auth_token,
            from_number,
        }
    }
}

#[async_trait]
impl SmsService for TwilioSmsService {
    async fn send(&self, to: &str, body: &str) -> Result<(), AppError> {
        let url = format!("{}/Accounts/{}/Messages.json", TWILIO_API_BASE, self.account_sid);

        let res = self.client.post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| {
                let msg = format!("SMS service connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("SMS service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        Ok(())
    }
}
