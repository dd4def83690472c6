//! Mailer trait and implementations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::{NotificationError, Result};

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Trait for delivering rendered emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a single email.
    async fn send(&self, email: &Email) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryMailerState {
    sent: Vec<Email>,
    fail_on_send: bool,
}

/// In-memory mailer for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMailer {
    state: Arc<RwLock<InMemoryMailerState>>,
}

impl InMemoryMailer {
    /// Creates a new in-memory mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the mailer to fail every send until reset.
    pub async fn set_fail_on_send(&self, fail: bool) {
        self.state.write().await.fail_on_send = fail;
    }

    /// Returns every email sent so far.
    pub async fn sent(&self) -> Vec<Email> {
        self.state.read().await.sent.clone()
    }

    /// Returns the emails sent to one address.
    pub async fn sent_to(&self, address: &str) -> Vec<Email> {
        self.state
            .read()
            .await
            .sent
            .iter()
            .filter(|email| email.to == address)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_send {
            return Err(NotificationError::Send("Mailer unavailable".to_string()));
        }

        state.sent.push(email.clone());
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Mailer posting JSON to a transactional email API.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    /// Creates a mailer for `endpoint`, authenticating with a bearer key.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client, endpoint, api_key, from))
    }

    /// Creates a mailer using an existing client.
    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[tracing::instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: &Email) -> Result<()> {
        let request = SendRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotificationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
