use anyhow::Result;
use chrono::{DateTime, Utc};
use feed_rs::parser;

/// One syndicated item as parsed from a feed, before sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    /// Entry body as published; may contain markup
    pub raw_body: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Entries parsed from one feed document.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Entries in document order
    pub entries: Vec<RawEntry>,
    /// Entries dropped because they carried no link
    pub skipped: usize,
}

/// Parse an RSS or Atom document into raw entries.
///
/// - `title` falls back to `"Untitled"`
/// - `raw_body` is the summary (RSS `description`), else the content body
/// - `published_at` is the published date, else the updated date
///
/// Entries without a usable link are skipped and counted, since the link is
/// the article's identity in the store.
pub fn parse_feed(bytes: &[u8]) -> Result<ParseResult> {
    let feed = parser::parse(bytes)?;

    let mut result = ParseResult::default();
    for entry in feed.entries {
        let link = entry
            .links
            .first()
            .map(|l| l.href.trim().to_string())
            .filter(|href| !href.is_empty());

        let Some(link) = link else {
            result.skipped += 1;
            continue;
        };

        let title = entry
            .title
            .map(|t| t.content)
            .unwrap_or_else(|| "Untitled".to_string());
        let raw_body = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        result.entries.push(RawEntry {
            title,
            raw_body,
            link,
            published_at: entry.published.or(entry.updated),
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_rss_items_in_order() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>News</title>
    <item>
        <title>First</title>
        <link>https://example.com/1</link>
        <description><![CDATA[<p>Hello <b>World</b></p>]]></description>
        <pubDate>Tue, 14 Nov 2023 22:13:20 GMT</pubDate>
    </item>
    <item>
        <title>Second</title>
        <link>https://example.com/2</link>
        <description>Plain</description>
    </item>
</channel></rss>"#;

        let result = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(result.skipped, 0);
        assert_eq!(
            result.entries,
            vec![
                RawEntry {
                    title: "First".to_string(),
                    raw_body: "<p>Hello <b>World</b></p>".to_string(),
                    link: "https://example.com/1".to_string(),
                    published_at: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
                },
                RawEntry {
                    title: "Second".to_string(),
                    raw_body: "Plain".to_string(),
                    link: "https://example.com/2".to_string(),
                    published_at: None,
                },
            ]
        );
    }

    #[test]
    fn test_parse_atom_uses_content_and_updated() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Atom</title>
    <id>urn:feed</id>
    <updated>2023-11-14T22:13:20Z</updated>
    <entry>
        <id>urn:entry:1</id>
        <title>Atom entry</title>
        <link href="https://example.com/atom/1"/>
        <updated>2023-11-14T22:13:20Z</updated>
        <content type="html">&lt;p&gt;Body&lt;/p&gt;</content>
    </entry>
</feed>"#;

        let result = parse_feed(atom.as_bytes()).unwrap();
        assert_eq!(result.entries.len(), 1);
        let entry = &result.entries[0];
        assert_eq!(entry.link, "https://example.com/atom/1");
        assert_eq!(entry.raw_body, "<p>Body</p>");
        assert_eq!(
            entry.published_at,
            Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_title_and_body_defaults() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><link>https://example.com/bare</link></item>
</channel></rss>"#;

        let result = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(result.entries[0].title, "Untitled");
        assert_eq!(result.entries[0].raw_body, "");
    }

    #[test]
    fn test_entries_without_link_skipped() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><title>No link</title></item>
    <item><title>Linked</title><link>https://example.com/ok</link></item>
</channel></rss>"#;

        let result = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].title, "Linked");
    }

    #[test]
    fn test_empty_channel() {
        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        let result = parse_feed(rss.as_bytes()).unwrap();
        assert!(result.entries.is_empty());
    }

    #[test]
    fn test_malformed_document_fails() {
        assert!(parse_feed(b"<not valid xml").is_err());
        assert!(parse_feed(b"").is_err());
    }
}
