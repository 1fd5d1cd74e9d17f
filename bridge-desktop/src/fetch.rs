//! Remote media download using reqwest.

use bridge_traits::error::{BridgeError, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry behaviour for media downloads.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

/// Downloads remote media into memory.
///
/// 5xx, 429 and transport failures are retried with exponential backoff;
/// other non-success statuses fail straight away.
#[derive(Clone)]
pub struct MediaFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl MediaFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("playback-core/0.1.0")
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {e}")))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Download `url`. Query strings are left out of logs.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let log_url = url.split(['?', '#']).next().unwrap_or(url);
        let mut backoff = self.policy.initial_backoff;
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts.max(1) {
            debug!(attempt, url = %log_url, "Fetching media");

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() || status.as_u16() == 429 {
                        warn!(status = status.as_u16(), attempt, "Media fetch rejected");
                        last_error = Some(BridgeError::SourceUnavailable(format!(
                            "HTTP {status}"
                        )));
                    } else if !status.is_success() {
                        return Err(BridgeError::SourceUnavailable(format!("HTTP {status}")));
                    } else {
                        let body = response
                            .bytes()
                            .await
                            .map_err(|e| BridgeError::SourceUnavailable(e.to_string()))?;
                        debug!(bytes = body.len(), url = %log_url, "Media fetched");
                        return Ok(body.to_vec());
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt, "Media fetch failed");
                    last_error = Some(BridgeError::SourceUnavailable(e.to_string()));
                }
            }

            if attempt < self.policy.max_attempts {
                sleep(backoff).await;
                backoff *= 2;
            }
        }

        Err(last_error
            .unwrap_or_else(|| BridgeError::SourceUnavailable("media fetch failed".to_string())))
    }
}

impl std::fmt::Debug for MediaFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaFetcher")
            .field("policy", &self.policy)
            .finish()
    }
}
