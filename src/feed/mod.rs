//! Feed retrieval: HTTP download and RSS/Atom parsing.
//!
//! - `parser` turns a feed document into [`RawEntry`] values using `feed-rs`
//! - `fetcher` downloads one feed with a timeout and size limit, then parses it
//!
//! # Example
//!
//! ```ignore
//! use rssbox::feed::HttpFetcher;
//!
//! let fetcher = HttpFetcher::from_config(&config)?;
//! let entries = fetcher.fetch_url("https://example.com/feed.xml").await?;
//! ```

mod fetcher;
mod parser;

pub use fetcher::{FetchError, HttpFetcher};
pub use parser::{parse_feed, ParseResult, RawEntry};
