//! OTP delivery backends.

use crate::error::{AppError, AppResult};
use crate::models::{OtpMethod, OtpPurpose};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Payload handed to a delivery backend
#[derive(Debug, Clone, Serialize)]
pub struct OtpMessage {
    pub recipient: String,
    pub method: OtpMethod,
    pub code: String,
    pub purpose: OtpPurpose,
    pub expires_in_minutes: i64,
}

#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, message: &OtpMessage) -> AppResult<()>;
}

/// Writes codes to the log; for development only
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send(&self, message: &OtpMessage) -> AppResult<()> {
        info!(
            recipient = %message.recipient,
            method = %message.method,
            purpose = %message.purpose,
            code = %message.code,
            "OTP issued (log delivery)"
        );
        Ok(())
    }
}

/// POSTs each code as JSON to an external delivery service
pub struct WebhookOtpSender {
    client: Client,
    url: String,
    retry_delay: Duration,
}

impl WebhookOtpSender {
    pub fn new(url: impl Into<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            retry_delay: Duration::from_millis(500),
        })
    }

    async fn post(&self, message: &OtpMessage) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.url)
            .json(message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl OtpSender for WebhookOtpSender {
    async fn send(&self, message: &OtpMessage) -> AppResult<()> {
        match self.post(message).await {
            Ok(()) => return Ok(()),
            Err(e) => warn!("OTP webhook failed, retrying once: {}", e),
        }

        tokio::time::sleep(self.retry_delay).await;

        self.post(message).await.map_err(|e| {
            warn!("OTP webhook failed after retry: {}", e);
            AppError::ExternalService("Failed to send OTP".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OtpMessage {
        OtpMessage {
            recipient: "ward.clerk@hospital.test".into(),
            method: OtpMethod::Email,
            code: "042917".into(),
            purpose: OtpPurpose::Login,
            expires_in_minutes: 10,
        }
    }

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_value(message()).unwrap();
        assert_eq!(json["method"], "email");
        assert_eq!(json["purpose"], "login");
        assert_eq!(json["code"], "042917");
        assert_eq!(json["expires_in_minutes"], 10);
    }

    #[tokio::test]
    async fn test_log_sender_always_succeeds() {
        assert!(LogOtpSender.send(&message()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_reports_external_failure() {
        let mut sender = WebhookOtpSender::new("http://127.0.0.1:9/otp").unwrap();
        sender.retry_delay = Duration::from_millis(10);
        let err = sender.send(&message()).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(msg) if msg == "Failed to send OTP"));
    }
}
