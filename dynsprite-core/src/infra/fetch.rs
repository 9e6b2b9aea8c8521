//! Network fetch of raw image bytes with retry logic.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::error::{Result, SpriteError};
use crate::settings::FetchSettings;

/// Anything that can turn a resource key into raw bytes.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;
}

/// HTTP-based fetcher with connection pooling and exponential backoff.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .timeout(settings.timeout());
        if let Some(agent) = settings.user_agent.as_deref() {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().map_err(|e| {
            SpriteError::Internal(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            max_retries: settings.max_retries.max(1),
            retry_backoff: settings.retry_backoff(),
        })
    }

    /// Check if a key is an URL this fetcher can download.
    pub fn supports_url(key: &str) -> bool {
        Url::parse(key)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    async fn fetch_once(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SpriteError::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpriteError::fetch(
                url.as_str(),
                format!("HTTP {status}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpriteError::fetch(url.as_str(), e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let url = Url::parse(key)
            .map_err(|e| SpriteError::fetch(key, format!("invalid url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SpriteError::fetch(
                key,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        let mut last_error = None;
        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = self.retry_backoff * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }

            match self.fetch_once(&url).await {
                Ok(bytes) => {
                    debug!(key, bytes = bytes.len(), attempt, "fetch completed");
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!(
                        key,
                        attempt = attempt + 1,
                        max = self.max_retries,
                        err = %e,
                        "fetch attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SpriteError::fetch(key, "no attempts made")))
    }
}
