//! Remote fetch seam.

use async_trait::async_trait;
use reqwest::Client;

use crate::{BenchError, BenchResult};

/// Retrieves the bytes behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> BenchResult<Vec<u8>>;
}

/// HTTPS fetcher backed by a shared reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> BenchResult<Vec<u8>> {
        let fail = |message: String| BenchError::Fetch {
            url: url.to_string(),
            message,
        };

        let resp = self.http.get(url).send().await.map_err(|e| fail(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(fail(format!("HTTP {}", resp.status())));
        }
        let body = resp.bytes().await.map_err(|e| fail(e.to_string()))?;
        Ok(body.to_vec())
    }
}
