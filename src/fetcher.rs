use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;

use crate::{
    config::Config,
    error::{AppError, AttemptError, FetchError, Result},
};

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// HTTP GET with bearer auth and a fixed-interval retry.
///
/// A 404 ends the fetch at once with [`FetchError::NotFound`]. Every other
/// failure (transport, timeout, non-2xx status, bad JSON) is retried after
/// `retry_delay` until `max_attempts` attempts have been made.
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    client: reqwest::Client,
    max_attempts: u32,
    retry_delay: Duration,
}

enum AttemptFailure {
    NotFound,
    Retryable(AttemptError),
}

impl RetryingFetcher {
    pub fn new(max_attempts: u32, retry_delay: Duration, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(
                crate::constants::FETCH_CONNECT_TIMEOUT_SECS,
            )))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            retry_delay,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.fetch_max_attempts,
            Duration::from_millis(config.fetch_retry_delay_ms),
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        api_key: &str,
    ) -> std::result::Result<T, FetchError> {
        let mut attempt = 1;
        loop {
            match self.attempt(url, api_key).await {
                Ok(payload) => return Ok(payload),
                Err(AttemptFailure::NotFound) => return Err(FetchError::NotFound),
                Err(AttemptFailure::Retryable(err)) => {
                    if attempt >= self.max_attempts {
                        tracing::debug!(
                            "GET {} failed after {} attempt(s): {}",
                            url,
                            attempt,
                            err
                        );
                        return Err(FetchError::Exhausted {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    tracing::debug!(
                        "GET {} attempt {}/{} failed: {} (retrying in {:?})",
                        url,
                        attempt,
                        self.max_attempts,
                        err,
                        self.retry_delay
                    );
                    sleep(self.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &str,
        api_key: &str,
    ) -> std::result::Result<T, AttemptFailure> {
        let response = self
            .client
            .get(url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| AttemptFailure::Retryable(e.into()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AttemptFailure::NotFound);
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptFailure::Retryable(e.into()))?;

        if !status.is_success() {
            return Err(AttemptFailure::Retryable(AttemptError::Status {
                status,
                body: body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect(),
            }));
        }

        serde_json::from_str(&body).map_err(|e| AttemptFailure::Retryable(e.into()))
    }
}
