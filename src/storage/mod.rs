//! SQLite persistence for the feed registry and the article store.
//!
//! Articles are keyed by link: the `articles.link` column is `UNIQUE` and
//! every write goes through [`Database::insert_article_if_absent`].

mod articles;
mod feeds;
mod schema;
mod types;

pub use schema::{Database, IN_MEMORY};
pub use types::{DatabaseError, FeedSource, NewArticle, StoredArticle};
