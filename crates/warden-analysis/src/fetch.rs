//! Resource fetching with a bounded timeout.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AnalysisError, Result};

/// Default timeout for a single resource download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum resource size accepted for analysis.
pub const MAX_RESOURCE_BYTES: usize = 10 * 1024 * 1024;

/// Downloads resource bytes for analysis.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetches the resource at `url`. Expiry of the timeout is a failure.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP fetcher backed by reqwest.
pub struct HttpResourceFetcher {
    client: reqwest::Client,
}

impl HttpResourceFetcher {
    /// Creates a fetcher with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Creates a fetcher with an explicit timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Warden/0.1")
            .build()
            .map_err(|e| AnalysisError::Fetch(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ResourceFetcher for HttpResourceFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AnalysisError::Fetch(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AnalysisError::Fetch(format!(
                "{}: HTTP {}",
                url,
                response.status()
            )));
        }

        if let Some(len) = response.content_length() {
            if len as usize > MAX_RESOURCE_BYTES {
                return Err(AnalysisError::Fetch(format!(
                    "{}: {} bytes exceeds limit",
                    url, len
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AnalysisError::Fetch(format!("{}: {}", url, e)))?;

        if bytes.len() > MAX_RESOURCE_BYTES {
            return Err(AnalysisError::Fetch(format!(
                "{}: {} bytes exceeds limit",
                url,
                bytes.len()
            )));
        }

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetcher_builds_with_default_timeout() {
        assert!(HttpResourceFetcher::new().is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_fetch_error() {
        // Reserved TLD guarantees resolution failure without network access.
        let fetcher = HttpResourceFetcher::with_timeout(Duration::from_millis(500)).unwrap();
        let result = fetcher.fetch("http://img.warden-test.invalid/a.png").await;
        assert!(matches!(result, Err(AnalysisError::Fetch(_))));
    }
}
