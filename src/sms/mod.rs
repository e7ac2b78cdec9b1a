//! Outbound SMS capability (Twilio message API).

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SmsConfig;

#[derive(Debug, Clone, Error)]
pub enum SmsError {
    #[error("sms gateway request failed: {0}")]
    Gateway(String),
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Send one text message; `to` must carry a country code
    async fn send(&self, to: &str, body: &str) -> Result<(), SmsError>;
}

/// Prefix numbers submitted without a country code
pub fn normalize_phone(phone: &str, country_prefix: &str) -> String {
    let trimmed = phone.trim();
    if trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("{}{}", country_prefix, trimmed)
    }
}

/// Twilio Messages API client using a messaging service SID
pub struct TwilioSms {
    client: reqwest::Client,
    config: SmsConfig,
}

impl TwilioSms {
    pub fn new(config: &SmsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> Result<(), SmsError> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.config.api_url, self.config.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("MessagingServiceSid", self.config.messaging_service_sid.as_str()),
                ("To", to),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| SmsError::Gateway(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SmsError::Gateway(format!("{}: {}", status.as_u16(), detail)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("9876543210", "+91"), "+919876543210");
        assert_eq!(normalize_phone(" 9876543210 ", "+91"), "+919876543210");
        assert_eq!(normalize_phone("+919876543210", "+91"), "+919876543210");
    }
}
