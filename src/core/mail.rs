//! Contact-form mail relay
//!
//! Forwards a contact submission to an HTTP mail relay. The relay account is
//! both sender and recipient: the studio mails itself.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail relay credentials are not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail relay returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactMessage {
    pub fn is_complete(&self) -> bool {
        [&self.name, &self.email, &self.message]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    pub fn subject(&self) -> String {
        format!("New message from {}", self.name.trim())
    }

    pub fn body(&self) -> String {
        format!(
            "Name: {}\nEmail: {}\nMessage: {}",
            self.name.trim(),
            self.email.trim(),
            self.message.trim()
        )
    }
}

#[async_trait]
pub trait MailRelay: Send + Sync {
    async fn send(&self, contact: &ContactMessage) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
struct RelayRequest {
    from: String,
    to: String,
    subject: String,
    text: String,
}

pub struct HttpMailRelay {
    client: Client,
    relay_url: String,
    credentials: Option<(String, String)>,
}

impl HttpMailRelay {
    pub fn new(relay_url: impl Into<String>, credentials: Option<(String, String)>) -> Self {
        Self {
            client: Client::new(),
            relay_url: relay_url.into(),
            credentials,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.mail.relay_url.clone(), Settings::mail_credentials())
    }
}

#[async_trait]
impl MailRelay for HttpMailRelay {
    async fn send(&self, contact: &ContactMessage) -> Result<(), MailError> {
        let (user, pass) = self.credentials.as_ref().ok_or(MailError::NotConfigured)?;

        let request = RelayRequest {
            from: format!("\"Pixel Studio\" <{}>", user),
            to: user.clone(),
            subject: contact.subject(),
            text: contact.body(),
        };

        let response = self
            .client
            .post(&self.relay_url)
            .basic_auth(user, Some(pass))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Status { status, body });
        }

        tracing::info!("[HttpMailRelay] Message sent from {}", contact.email.trim());
        Ok(())
    }
}
