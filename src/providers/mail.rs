//! Transactional mail provider client, used for invoice delivery.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Mail provider rejected the message: {status}: {body}")]
    ProviderError { status: u16, body: String },
}

/// One outbound transactional email.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// HTTP client for the configured mail provider's send API.
pub struct MailClient {
    client: Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl MailClient {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MailError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            sender: config.sender.clone(),
        })
    }

    /// The message a recipient/subject/body triple becomes, with the
    /// configured sender applied.
    pub fn compose(&self, to: &str, subject: &str, html: &str) -> OutboundEmail {
        OutboundEmail {
            from: self.sender.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        }
    }

    pub async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| MailError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::ProviderError {
                status: status.as_u16(),
                body,
            });
        }

        info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}
