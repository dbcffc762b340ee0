use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::util::UrlValidationError;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("The database is locked by another rssbox process. Please wait for it to finish and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A feed URL was rejected before reaching the database
    #[error("Invalid feed URL: {0}")]
    InvalidFeedUrl(#[from] UrlValidationError),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A registered feed source.
///
/// The ingestion pipeline only ever reads these; they are created and
/// removed through the feed management operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FeedSource {
    pub id: i64,
    pub url: String,
    /// Unix seconds when the source was registered
    pub created_at: i64,
}

/// An article ready to be written, keyed by `link`.
///
/// `title` and `content` are expected to be sanitized already.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub feed_id: i64,
}

/// An article as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredArticle {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Originating feed; `None` once that feed has been removed
    pub feed_id: Option<i64>,
    /// Unix seconds when the article was first stored
    pub fetched_at: i64,
}

// ============================================================================
// Helper Types
// ============================================================================

/// Internal row type for article queries (used by sqlx FromRow)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArticleDbRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub link: String,
    pub published_at: Option<i64>,
    pub feed_id: Option<i64>,
    pub fetched_at: i64,
}

impl ArticleDbRow {
    pub(crate) fn into_article(self) -> StoredArticle {
        StoredArticle {
            id: self.id,
            title: self.title,
            content: self.content,
            link: self.link,
            published_at: self
                .published_at
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            feed_id: self.feed_id,
            fetched_at: self.fetched_at,
        }
    }
}
