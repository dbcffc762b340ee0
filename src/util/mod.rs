//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **URL validation**: feed sources must be absolute http(s) URLs
//! - **Markup stripping**: turn feed entry HTML into storable plain text
//!
//! # Examples
//!
//! ```
//! use rssbox::util::{strip_tags, validate_url};
//!
//! let url = validate_url("https://example.com/feed.xml").unwrap();
//! assert_eq!(url.scheme(), "https");
//!
//! assert_eq!(strip_tags("<p>Hello <b>World</b></p>"), "Hello World");
//! ```

mod html;
mod url_validator;

pub use html::strip_tags;
pub use url_validator::{validate_url, UrlValidationError};
