use serde::Serialize;

use crate::configuration::EmailClientSettings;
use crate::error::{AppError, ConfigError, EmailError};
use crate::validators::is_valid_email;

#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: String,
    sender: SenderEmail,
    recovery_url: String,
}

/// Validated `From` address
#[derive(Clone, Debug)]
pub struct SenderEmail(String);

impl SenderEmail {
    /// # Errors
    /// A config error: the sender comes from settings, not from a request
    pub fn parse(s: String) -> Result<Self, AppError> {
        let email = is_valid_email(&s)
            .map_err(|e| ConfigError::InvalidValue(format!("email_client.sender_email: {}", e)))?;
        Ok(Self(email))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SenderEmail,
        recovery_url: String,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            http_client,
            base_url,
            sender,
            recovery_url,
        }
    }

    pub fn from_settings(settings: &EmailClientSettings) -> Result<Self, AppError> {
        let sender = SenderEmail::parse(settings.sender_email.clone())?;
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::new(
            settings.base_url.clone(),
            sender,
            settings.recovery_url.clone(),
            http_client,
        ))
    }

    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), AppError> {
        let recipient =
            is_valid_email(recipient).map_err(|e| EmailError::InvalidRecipient(e.to_string()))?;
        let url = format!("{}/email", self.base_url);
        let request = SendEmailRequest {
            from: self.sender.inner(),
            to: &recipient,
            subject,
            html_body: html_content,
            text_body: text_content,
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email: {}", e);
                EmailError::SendFailed(e.to_string())
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Email service returned error: {}", e);
                EmailError::SendFailed(e.to_string())
            })?;

        Ok(())
    }

    /// Mail a password recovery link carrying `token`
    pub async fn send_password_recovery(
        &self,
        recipient: &str,
        token: &str,
    ) -> Result<(), AppError> {
        let link = format!("{}?token={}", self.recovery_url, token);
        let html = format!(
            "To choose a new password open <a href=\"{}\">this link</a>.<br/>\
             If you did not request a password change, ignore this email.",
            link
        );
        let text = format!(
            "To choose a new password open {}\n\
             If you did not request a password change, ignore this email.",
            link
        );

        self.send_email(recipient, "Password recovery", &html, &text).await
    }
}
