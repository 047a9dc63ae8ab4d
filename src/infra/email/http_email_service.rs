use crate::domain::ports::EmailService;
use crate::error::AppError;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

/// Posts rendered mail to the venue's relay service as JSON.
pub struct HttpEmailService {
    client: Client,
    relay_url: String,
    relay_token: String,
}

impl HttpEmailService {
    pub fn new(relay_url: String, relay_token: String) -> Self {
        Self {
            client: Client::new(),
            relay_url,
            relay_token,
        }
    }
}

#[derive(Serialize)]
struct RelayAttachment<'a> {
    filename: &'a str,
    content_type: &'static str,
    content_base64: String,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from_alias: &'static str,
    to_addr: &'a str,
    subject: &'a str,
    html_body: &'a str,
    attachments: Vec<RelayAttachment<'a>>,
}

fn content_type_for(filename: &str) -> &'static str {
    if filename.ends_with(".ics") {
        "text/calendar; method=REQUEST"
    } else {
        "application/octet-stream"
    }
}

#[async_trait]
impl EmailService for HttpEmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        attachment_name: Option<&str>,
        attachment_data: Option<&[u8]>,
    ) -> Result<(), AppError> {
        let attachments = match (attachment_name, attachment_data) {
            (Some(filename), Some(data)) => vec![RelayAttachment {
                filename,
                content_type: content_type_for(filename),
                content_base64: general_purpose::STANDARD.encode(data),
            }],
            _ => Vec::new(),
        };

        let message = RelayMessage {
            from_alias: "bookings",
            to_addr: recipient,
            subject,
            html_body,
            attachments,
        };

        let res = self.client.post(&self.relay_url)
            .bearer_auth(&self.relay_token)
            .json(&message)
            .send()
            .await
            .map_err(|e| {
                error!("Mail relay unreachable: {}", e);
                AppError::InternalWithMsg(format!("Mail relay connection error: {}", e))
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Mail relay rejected message: {}", body);
            return Err(AppError::InternalWithMsg(format!("Mail relay failed with status {}", status)));
        }

        debug!(recipient, "Mail relay accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_attachments_get_calendar_content_type() {
        assert_eq!(content_type_for("booking.ics"), "text/calendar; method=REQUEST");
        assert_eq!(content_type_for("receipt.pdf"), "application/octet-stream");
    }
}
