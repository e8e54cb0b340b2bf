//! # ra-source-fourchan
//!
//! `ContentSource` backed by the 4chan read-only JSON API
//! (`a.4cdn.org`). Requests carry a configurable User-Agent and are bounded
//! by a client-wide timeout, since the archiver applies none of its own.

pub mod api;

use std::time::Duration;

use async_trait::async_trait;
use ra_core::error::{AppError, Result};
use ra_core::models::{Thread, ThreadSummary};
use ra_core::traits::ContentSource;
use tracing::debug;

pub use api::{parse_catalog, parse_thread, quoted_ids};

#[derive(Debug, Clone)]
pub struct FourChanConfig {
    pub user_agent: String,
    /// JSON API root, without trailing slash
    pub api_base: String,
    /// Media host root, without trailing slash
    pub media_base: String,
    pub timeout: Duration,
}

impl Default for FourChanConfig {
    fn default() -> Self {
        Self {
            user_agent: "rusty-archive/0.1".to_string(),
            api_base: "https://a.4cdn.org".to_string(),
            media_base: "https://i.4cdn.org".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

pub struct FourChanSource {
    client: reqwest::Client,
    config: FourChanConfig,
}

impl FourChanSource {
    pub fn new(config: FourChanConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Source(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FourChanConfig {
        &self.config
    }

    async fn get(&self, url: &str) -> Result<String> {
        debug!(url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Source(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Source(format!("reading {url} failed: {e}")))?;
        if status != reqwest::StatusCode::OK {
            return Err(AppError::Source(format!("GET {url}: {status}: {body}")));
        }
        Ok(body)
    }
}

#[async_trait]
impl ContentSource for FourChanSource {
    fn name(&self) -> &'static str {
        "4chan"
    }

    async fn fetch_thread(&self, board: &str, thread_id: &str) -> Result<Thread> {
        let url = format!("{}/{board}/thread/{thread_id}.json", self.config.api_base);
        let body = self.get(&url).await?;
        parse_thread(board, thread_id, &self.config.media_base, &body)
    }

    async fn fetch_board(&self, board: &str, limit: i64) -> Result<Vec<ThreadSummary>> {
        let url = format!("{}/{board}/catalog.json", self.config.api_base);
        let body = self.get(&url).await?;
        parse_catalog(board, limit, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let source = FourChanSource::new(FourChanConfig::default()).unwrap();
        assert_eq!(source.name(), "4chan");
        assert_eq!(source.config().timeout, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_source_error() {
        let source = FourChanSource::new(FourChanConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..FourChanConfig::default()
        })
        .unwrap();
        assert!(matches!(
            source.fetch_thread("g", "1").await,
            Err(AppError::Source(_))
        ));
    }
}
