use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{ArticleDbRow, DatabaseError, NewArticle, StoredArticle};

// ============================================================================
// Query Limit Constants
// ============================================================================

/// Maximum number of articles to return from any single query (OOM protection)
const MAX_ARTICLES: i64 = 2000;

/// Maximum number of ids accepted by get_articles_by_ids (SQLite parameter limit)
const MAX_IDS: usize = 900;

impl Database {
    // ========================================================================
    // Article Writes
    // ========================================================================

    /// Insert an article unless one with the same link already exists.
    ///
    /// Returns `true` only if a new row was created. The check and the
    /// insert are a single statement (`ON CONFLICT(link) DO NOTHING`), so
    /// concurrent writers can never create two rows for one link.
    pub async fn insert_article_if_absent(
        &self,
        article: &NewArticle,
    ) -> Result<bool, DatabaseError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, content, link, published_at, feed_id, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(link) DO NOTHING
        "#,
        )
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.link)
        .bind(article.published_at.map(|dt| dt.timestamp()))
        .bind(article.feed_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Article Queries
    // ========================================================================

    /// Total number of stored articles.
    pub async fn count_articles(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(count)
    }

    /// Most recently published articles first; undated articles last.
    ///
    /// Capped at MAX_ARTICLES (2000).
    pub async fn get_articles(&self, limit: Option<i64>) -> Result<Vec<StoredArticle>, DatabaseError> {
        let limit = limit.unwrap_or(MAX_ARTICLES).clamp(0, MAX_ARTICLES);

        let rows = sqlx::query_as::<_, ArticleDbRow>(
            r#"
            SELECT id, title, content, link, published_at, feed_id, fetched_at
            FROM articles
            ORDER BY published_at DESC NULLS LAST, id DESC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(rows.into_iter().map(ArticleDbRow::into_article).collect())
    }

    /// Fetch the given articles, ordered like [`Database::get_articles`].
    ///
    /// Unknown ids are ignored. Only the first 900 ids are considered.
    pub async fn get_articles_by_ids(
        &self,
        ids: &[i64],
    ) -> Result<Vec<StoredArticle>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > MAX_IDS {
            tracing::warn!(requested = ids.len(), max = MAX_IDS, "Truncating article id list");
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "SELECT id, title, content, link, published_at, feed_id, fetched_at \
             FROM articles WHERE id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in ids.iter().take(MAX_IDS) {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY published_at DESC NULLS LAST, id DESC");

        let rows = builder
            .build_query_as::<ArticleDbRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(rows.into_iter().map(ArticleDbRow::into_article).collect())
    }

    /// Look up the article stored for a link, if any.
    pub async fn get_article_by_link(
        &self,
        link: &str,
    ) -> Result<Option<StoredArticle>, DatabaseError> {
        let row = sqlx::query_as::<_, ArticleDbRow>(
            r#"
            SELECT id, title, content, link, published_at, feed_id, fetched_at
            FROM articles
            WHERE link = ?
        "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(row.map(ArticleDbRow::into_article))
    }
}
