//! rssbox: fetch RSS/Atom feeds concurrently and store each article once.
//!
//! - [`storage`] - SQLite feed registry and article store
//! - [`feed`] - HTTP fetching and feed parsing
//! - [`ingest`] - the concurrent ingestion cycle
//! - [`util`] - HTML stripping and URL validation

pub mod config;
pub mod feed;
pub mod ingest;
pub mod storage;
pub mod util;
