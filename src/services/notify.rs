//! Transactional email through the Brevo API.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use serde_json::json;
use std::time::Duration;

use super::password_reset::RESET_CODE_TTL_MINUTES;
use crate::error::AppError;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub api_key: Option<String>,
    pub sender_email: String,
    pub sender_name: String,
    pub api_url: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("BREVO_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            sender_email: std::env::var("BREVO_SENDER_EMAIL")
                .unwrap_or_else(|_| "noreply@example.org".to_string()),
            sender_name: std::env::var("BREVO_SENDER_NAME")
                .unwrap_or_else(|_| "The Foundation".to_string()),
            api_url: BREVO_SEND_URL.to_string(),
        }
    }
}

/// Renders the reset email. The validity line uses the same TTL the reset
/// service applies. `code` is expected to be digits only.
pub fn render_reset_email(code: &str, year: i32, sender_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <style>
    body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    .header {{ background: #16a34a; color: white; padding: 20px; text-align: center; }}
    .content {{ padding: 30px; background: #f9f9f9; }}
    .code-box {{ background: #16a34a; color: white; font-size: 32px; font-weight: bold;
      letter-spacing: 8px; padding: 20px 30px; text-align: center; border-radius: 10px; margin: 25px 0; }}
    .footer {{ padding: 20px; text-align: center; color: #666; font-size: 12px; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header"><h1>{name}</h1></div>
    <div class="content">
      <h2>Password Reset Code</h2>
      <p>We received a request to reset your password. Use the code below to reset your password:</p>
      <div class="code-box">{code}</div>
      <p><strong>This code will expire in {ttl} minutes.</strong></p>
      <p>If you didn't request this password reset, you can safely ignore this email.</p>
    </div>
    <div class="footer"><p>&copy; {year} {name}. All rights reserved.</p></div>
  </div>
</body>
</html>"#,
        name = sender_name,
        code = code,
        ttl = RESET_CODE_TTL_MINUTES,
        year = year,
    )
}

#[derive(Debug, Clone)]
pub struct Mailer {
    config: MailerConfig,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Fails with [`AppError::Configuration`] before any network call when no
    /// API key is set, and with [`AppError::Notification`] when the send fails.
    pub async fn send_reset_code(&self, email: &str, code: &str) -> Result<(), AppError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            tracing::error!("BREVO_API_KEY not configured");
            AppError::Configuration("Email service not configured".to_string())
        })?;

        let body = json!({
            "sender": {
                "name": self.config.sender_name,
                "email": self.config.sender_email,
            },
            "to": [{ "email": email }],
            "subject": format!("Your Password Reset Code - {}", self.config.sender_name),
            "htmlContent": render_reset_email(code, Utc::now().year(), &self.config.sender_name),
        });

        let response = HTTP_CLIENT
            .post(&self.config.api_url)
            .header("Accept", "application/json")
            .header("api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "email provider request failed");
                AppError::Notification(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, details = %details, "email provider returned error");
            return Err(AppError::Notification(format!(
                "provider responded with {}",
                status
            )));
        }

        tracing::info!(email = %email, "password reset code sent");
        Ok(())
    }
}
