//! CAD splitter trait and implementations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tokio::sync::RwLock;

use crate::error::{CadError, Result};
use crate::retry::RetryPolicy;

/// A CAD file to be split into parts.
#[derive(Debug, Clone)]
pub struct CadUpload {
    pub user_id: String,
    pub order_id: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Trait for splitting CAD files.
#[async_trait]
pub trait CadSplitter: Send + Sync {
    /// Submits a file and returns the service's JSON answer.
    async fn split(&self, upload: CadUpload) -> Result<serde_json::Value>;
}

#[derive(Debug, Default)]
struct InMemoryCadState {
    uploads: Vec<CadUpload>,
    failures_remaining: u32,
}

/// In-memory splitter for testing.
///
/// Answers every upload with one part per non-empty line of the file, stored
/// under `parts/<order_id>/`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCadSplitter {
    state: Arc<RwLock<InMemoryCadState>>,
}

impl InMemoryCadSplitter {
    /// Creates a new in-memory splitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls fail as unavailable.
    pub async fn fail_next(&self, count: u32) {
        self.state.write().await.failures_remaining = count;
    }

    /// Returns the number of uploads received.
    pub async fn upload_count(&self) -> usize {
        self.state.read().await.uploads.len()
    }
}

#[async_trait]
impl CadSplitter for InMemoryCadSplitter {
    async fn split(&self, upload: CadUpload) -> Result<serde_json::Value> {
        let mut state = self.state.write().await;

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(CadError::Status {
                status: 503,
                body: "CAD service unavailable".to_string(),
            });
        }

        let parts: Vec<String> = String::from_utf8_lossy(&upload.bytes)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| format!("parts/{}/{}", upload.order_id, line))
            .collect();
        let body = serde_json::json!({
            "data": {
                "user_id": upload.user_id,
                "order_id": upload.order_id,
                "original": format!("uploads/{}/{}", upload.order_id, upload.file_name),
                "parts": parts,
            }
        });

        state.uploads.push(upload);
        Ok(body)
    }
}

/// Splitter calling the CAD service over HTTP.
///
/// Each attempt is bounded by the client timeout; transport failures and 5xx
/// answers are retried with exponential backoff.
#[derive(Debug, Clone)]
pub struct HttpCadSplitter {
    client: reqwest::Client,
    endpoint: String,
    policy: RetryPolicy,
}

impl HttpCadSplitter {
    /// Creates a splitter posting to `<base_url>/split`.
    pub fn new(base_url: &str, timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CadError::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/split", base_url.trim_end_matches('/')),
            policy,
        })
    }

    /// Returns the retry policy in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn attempt(&self, upload: &CadUpload) -> Result<serde_json::Value> {
        let mut file = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
        if let Some(content_type) = &upload.content_type {
            file = file
                .mime_str(content_type)
                .map_err(|e| CadError::Config(e.to_string()))?;
        }
        let form = Form::new()
            .text("user_id", upload.user_id.clone())
            .text("order_id", upload.order_id.clone())
            .part("file", file);

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| CadError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CadSplitter for HttpCadSplitter {
    #[tracing::instrument(skip(self, upload), fields(order_id = %upload.order_id, file = %upload.file_name))]
    async fn split(&self, upload: CadUpload) -> Result<serde_json::Value> {
        let started = Instant::now();
        let mut attempt = 0;

        let result = loop {
            attempt += 1;
            metrics::counter!("cad_split_attempts_total").increment(1);

            match self.attempt(&upload).await {
                Ok(body) => break Ok(body),
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(attempt, ?delay, error = %e, "CAD split failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => break Err(e),
            }
        };

        metrics::histogram!("cad_split_duration_seconds").record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            tracing::error!(attempt, error = %e, "CAD split failed");
        }
        result
    }
}
