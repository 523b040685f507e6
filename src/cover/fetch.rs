//! Remote artwork fetching.
//!
//! The [`ArtworkFetcher`] trait lets the resolver be tested without a
//! network: production code uses [`HttpArtworkFetcher`], tests substitute
//! the mock.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Fetches image bytes from a URL.
#[async_trait]
pub trait ArtworkFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP fetcher with a per-request timeout.
pub struct HttpArtworkFetcher {
    http_client: reqwest::Client,
}

impl HttpArtworkFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("music-fetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::artwork(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ArtworkFetcher for HttpArtworkFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::artwork(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::artwork(format!(
                "{}: HTTP {}: {}",
                url,
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| Error::artwork(format!("{}: {}", url, e)))?
            .to_vec();

        if data.is_empty() {
            return Err(Error::artwork(format!("{}: empty response", url)));
        }
        Ok(data)
    }
}
