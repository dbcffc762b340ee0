//! Feed ingestion: fetch every registered feed concurrently and store each
//! new article exactly once per link.
//!
//! The coordinator ([`Ingestor`]) depends only on three capabilities, so it
//! can be driven by the SQLite store and HTTP fetcher in production and by
//! in-memory fakes in tests:
//!
//! - [`SourceRegistry`] - the list of feeds to fetch
//! - [`EntryFetcher`] - fetch and parse one feed
//! - [`ArticleWriter`] - idempotent insert keyed by link
//!
//! # Example
//!
//! ```ignore
//! use rssbox::ingest::Ingestor;
//!
//! let ingestor = Ingestor::new(db.clone(), fetcher, db.clone())
//!     .with_concurrency(config.fetch_concurrency());
//! let result = ingestor.run_cycle().await?;
//! println!("{} new articles", result.new_article_count);
//! ```

mod coordinator;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::feed::{FetchError, RawEntry};
use crate::storage::{Database, DatabaseError, FeedSource, NewArticle};

pub use coordinator::{Ingestor, DEFAULT_CONCURRENCY};

// ============================================================================
// Capabilities
// ============================================================================

/// Supplies the feed sources for one ingestion run.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<FeedSource>, DatabaseError>;
}

/// Fetches and parses a single feed source.
///
/// Implementations make one attempt per call and report any failure for
/// that source only.
#[async_trait]
pub trait EntryFetcher: Send + Sync + 'static {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawEntry>, FetchError>;
}

/// Stores articles with duplicate suppression on `link`.
#[async_trait]
pub trait ArticleWriter: Send + Sync {
    /// Returns `true` only if a new article was created.
    async fn insert_article_if_absent(&self, article: &NewArticle) -> Result<bool, DatabaseError>;
}

#[async_trait]
impl SourceRegistry for Database {
    async fn list_sources(&self) -> Result<Vec<FeedSource>, DatabaseError> {
        self.list_feeds().await
    }
}

#[async_trait]
impl ArticleWriter for Database {
    async fn insert_article_if_absent(&self, article: &NewArticle) -> Result<bool, DatabaseError> {
        Database::insert_article_if_absent(self, article).await
    }
}

// ============================================================================
// Messages and Results
// ============================================================================

/// One parsed entry together with the feed that produced it.
///
/// Entries and their source always travel as one message so that
/// concurrent producers can never attribute an entry to the wrong feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedEntry {
    pub source_id: i64,
    pub entry: RawEntry,
}

/// A non-fatal problem encountered during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestFailure {
    /// The feed could not be fetched or parsed; it contributed no entries.
    SourceFetchFailed {
        source_id: i64,
        url: String,
        cause: String,
    },
    /// Storing one entry failed; the entry was skipped.
    WriteFailed { link: String, cause: String },
}

/// Outcome of one completed ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionResult {
    /// Articles that did not exist before this run
    pub new_article_count: usize,
    pub sources_total: usize,
    pub sources_failed: usize,
    /// Entries received from all successful fetches
    pub entries_seen: usize,
    /// Entries whose link was already stored
    pub duplicates: usize,
    pub write_failures: usize,
    pub failures: Vec<IngestFailure>,
}

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The feed list could not be read, so nothing was fetched.
    #[error("Feed source list unavailable: {0}")]
    SourceListUnavailable(#[source] DatabaseError),
}
