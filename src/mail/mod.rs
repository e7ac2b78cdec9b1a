//! Outbound mail capability.
//!
//! The production mailer posts JSON to a transactional-mail HTTP relay;
//! handlers only see the [`Mailer`] trait, so tests swap in a recorder.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("mail relay request failed: {0}")]
    Relay(String),
}

/// One outbound HTML mail
#[derive(Debug, Clone)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailError>;
}

/// Mailer backed by an HTTP JSON mail relay
pub struct HttpMailer {
    client: reqwest::Client,
    config: EmailConfig,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "from": self.config.sender,
                "to": mail.to,
                "subject": mail.subject,
                "html": mail.html,
            }))
            .send()
            .await
            .map_err(|e| MailError::Relay(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Relay(format!("{}: {}", status.as_u16(), body)));
        }

        Ok(())
    }
}

/// HTML body for the login OTP mail
pub fn otp_email_html(code: &str, ttl_minutes: i64) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; background-color: #f8fafc; padding: 30px; text-align: center;">
  <div style="max-width: 500px; margin: auto; background-color: #ffffff; border-radius: 12px; padding: 40px;">
    <h1 style="color: #16a34a; font-size: 28px; margin-bottom: 10px;">VoltQ</h1>
    <p style="font-size: 16px; color: #374151; margin-bottom: 20px;">Your One-Time Password (OTP) is:</p>
    <div style="font-size: 32px; font-weight: bold; color: #16a34a; letter-spacing: 4px; border: 2px dashed #16a34a; display: inline-block; padding: 10px 20px; border-radius: 8px;">
      {code}
    </div>
    <p style="font-size: 14px; color: #6b7280; margin-top: 30px;">
      This OTP is valid for <strong>{ttl_minutes} minutes</strong>. Do not share it with anyone.
    </p>
  </div>
</div>"#
    )
}

/// HTML body for the feedback summary mail
pub fn feedback_email_html(
    rating: u8,
    comment: &str,
    name: Option<&str>,
    email: Option<&str>,
) -> String {
    let stars: String = "★".repeat(rating as usize) + &"☆".repeat(5usize.saturating_sub(rating as usize));
    format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 20px; background: #f8fafc;">
  <h2 style="color: #16a34a;">New Feedback Received</h2>
  <table style="border-collapse: collapse; width: 100%; max-width: 600px; margin-top: 20px;">
    <tr><td style="padding: 10px; font-weight: bold; border: 1px solid #e5e7eb;">Rating</td><td style="padding: 10px; border: 1px solid #e5e7eb;">{stars}</td></tr>
    <tr><td style="padding: 10px; font-weight: bold; border: 1px solid #e5e7eb;">Comment</td><td style="padding: 10px; border: 1px solid #e5e7eb;">{comment}</td></tr>
    <tr><td style="padding: 10px; font-weight: bold; border: 1px solid #e5e7eb;">Name</td><td style="padding: 10px; border: 1px solid #e5e7eb;">{name}</td></tr>
    <tr><td style="padding: 10px; font-weight: bold; border: 1px solid #e5e7eb;">Email</td><td style="padding: 10px; border: 1px solid #e5e7eb;">{email}</td></tr>
  </table>
</div>"#,
        name = name.unwrap_or("N/A"),
        email = email.unwrap_or("N/A"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_email_contains_code_and_ttl() {
        let html = otp_email_html("482913", 5);
        assert!(html.contains("482913"));
        assert!(html.contains("5 minutes"));
    }

    #[test]
    fn test_feedback_email_star_rendering() {
        let html = feedback_email_html(3, "Good app", None, None);
        assert!(html.contains("★★★☆☆"));
        assert!(html.contains("N/A"));
    }
}
