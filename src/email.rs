//! Outbound email delivery for password resets.
//!
//! Sends via the Resend API when an API key is configured; otherwise logs
//! the message and reports it as skipped (useful for development).

use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    Sent,
    /// No API key configured; message was logged instead of delivered.
    Skipped,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

pub struct EmailService {
    client: Client,
    api_key: Option<String>,
    from: String,
}

impl EmailService {
    pub fn new(api_key: Option<String>, from: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<EmailSendResult> {
        let Some(ref api_key) = self.api_key else {
            tracing::info!("Email delivery disabled, skipping send to {}: {}", to, subject);
            return Ok(EmailSendResult::Skipped);
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(api_key)
            .json(&SendEmailRequest {
                from: &self.from,
                to: [to],
                subject,
                html,
            })
            .send()
            .await
            .map_err(|e| AppError::External(format!("Email API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::External(format!(
                "Email API returned {}: {}",
                status, body
            )));
        }

        Ok(EmailSendResult::Sent)
    }
}

/// Build the password reset email body.
pub fn reset_password_email(reset_link: &str) -> String {
    format!(
        r#"<h1>Password Reset</h1>
<p>You requested a password reset for your store.</p>
<p>Click the link below to continue:</p>
<a href="{link}">{link}</a>
<p>This link expires in 1 hour.</p>
<p>If you did not request this, you can ignore this email.</p>"#,
        link = reset_link
    )
}
