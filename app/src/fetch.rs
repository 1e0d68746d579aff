//! Subscription retrieval over HTTP(S) or the local filesystem.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use harvest_core::{ContentRetriever, FetchError};

/// Browser-like agent; several subscription hosts reject unknown clients.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Whole-request timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One plain GET per address; no retries.
///
/// Certificate verification is off: many subscription hosts serve
/// self-signed or mismatched certificates.
pub struct HttpRetriever {
    client: reqwest::Client,
}

impl HttpRetriever {
    /// Client with the default agent and timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    /// Client with a custom whole-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

fn is_http(address: &str) -> bool {
    let lower = address.get(..8).unwrap_or(address).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[async_trait]
impl ContentRetriever for HttpRetriever {
    async fn retrieve(&self, address: &str) -> Result<String, FetchError> {
        let address = address.trim();
        if is_http(address) {
            return self.get(address).await;
        }
        let path = address.strip_prefix("file://").unwrap_or(address);
        let bytes = tokio::fs::read(Path::new(path)).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
