use super::schema::Database;
use super::types::{DatabaseError, FeedSource};
use crate::util::validate_url;

impl Database {
    // ========================================================================
    // Feed Registry Operations
    // ========================================================================

    /// Register a feed URL, returning the stored source.
    ///
    /// The URL is validated and normalized first. Registering a URL that is
    /// already present returns the existing source unchanged.
    pub async fn add_feed(&self, url: &str) -> Result<FeedSource, DatabaseError> {
        let url = validate_url(url)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query("INSERT INTO feeds (url, created_at) VALUES (?, ?) ON CONFLICT(url) DO NOTHING")
            .bind(url.as_str())
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let feed = sqlx::query_as::<_, FeedSource>(
            "SELECT id, url, created_at FROM feeds WHERE url = ?",
        )
        .bind(url.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        tracing::info!(feed_id = feed.id, url = %feed.url, "Feed registered");
        Ok(feed)
    }

    /// Remove a feed by URL. Returns whether a feed was actually removed.
    ///
    /// Articles already ingested from the feed are kept and detached.
    pub async fn remove_feed(&self, url: &str) -> Result<bool, DatabaseError> {
        // Normalize the same way add_feed did so "https://x.com" matches
        // the stored "https://x.com/". Fall back to the raw string for
        // rows that predate validation.
        let normalized = validate_url(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.trim().to_string());

        let result = sqlx::query("DELETE FROM feeds WHERE url = ?")
            .bind(&normalized)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let removed = result.rows_affected() > 0;
        if removed {
            tracing::info!(url = %normalized, "Feed removed");
        }
        Ok(removed)
    }

    /// List all registered feeds, most recently added first.
    pub async fn list_feeds(&self) -> Result<Vec<FeedSource>, DatabaseError> {
        sqlx::query_as::<_, FeedSource>(
            "SELECT id, url, created_at FROM feeds ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
