use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::feed::parser::{parse_feed, ParseResult, RawEntry};
use crate::ingest::EntryFetcher;
use crate::storage::FeedSource;
use crate::util::{validate_url, UrlValidationError};

/// Errors that can occur while fetching one feed.
///
/// These errors cover the full lifecycle of a fetch: URL checks, network
/// issues, HTTP errors, size limits and parsing failures.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source URL is not a fetchable http(s) URL
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the configured size limit
    #[error("Response too large (limit {0} bytes)")]
    ResponseTooLarge(usize),
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Fetches feeds over HTTP and parses them with `feed-rs`.
///
/// A single attempt is made per call; there are no retries at this layer.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_size: usize,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration, max_size: usize) -> Self {
        Self {
            client,
            timeout,
            max_size,
        }
    }

    /// Build a fetcher with its own client using the configured user agent,
    /// timeout and body size limit.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self::new(
            client,
            Duration::from_secs(config.fetch_timeout_secs),
            config.max_feed_size_bytes,
        ))
    }

    /// Download and parse the feed at `url`.
    pub async fn fetch_url(&self, url: &str) -> Result<Vec<RawEntry>, FetchError> {
        let url = validate_url(url)?;

        let bytes = tokio::time::timeout(self.timeout, self.download(url.clone()))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let ParseResult { entries, skipped } =
            parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

        if skipped > 0 {
            tracing::warn!(url = %url, skipped = skipped, "Entries without a link skipped");
        }

        Ok(entries)
    }

    async fn download(&self, url: url::Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_size).await
    }
}

#[async_trait]
impl EntryFetcher for HttpFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawEntry>, FetchError> {
        let entries = self.fetch_url(&source.url).await?;
        tracing::debug!(
            feed_id = source.id,
            url = %source.url,
            entries = entries.len(),
            "Feed fetched"
        );
        Ok(entries)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
