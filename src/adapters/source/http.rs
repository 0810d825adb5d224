//! HTTP(S) archive source

use super::traits::{ArchiveSource, RemoteArchive};
use crate::config::SourceConfig;
use crate::domain::FetchError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Streams the archive over HTTP with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpArchiveSource {
    client: Client,
}

impl HttpArchiveSource {
    /// Build a client with the configured connect timeout and user agent
    ///
    /// No overall request timeout is set; a slow but steady download is
    /// bounded by the fetcher's per-chunk stall timeout instead.
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Network {
                url: config.url.clone(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    fn network_error(url: &str, error: reqwest::Error) -> FetchError {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl ArchiveSource for HttpArchiveSource {
    async fn remote_size(&self, url: &str) -> Result<Option<u64>, FetchError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| Self::network_error(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        // HEAD bodies are empty, so the size hint is useless here
        Ok(response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok()))
    }

    async fn open(&self, url: &str) -> Result<RemoteArchive, FetchError> {
        tracing::debug!(url = %url, "Requesting archive");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::network_error(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_length = response.content_length();
        let owned_url = url.to_string();
        let chunks = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| Self::network_error(&owned_url, e)))
            .boxed();

        Ok(RemoteArchive {
            content_length,
            chunks,
        })
    }
}
