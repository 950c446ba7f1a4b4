//! RSS 2.0 and Atom feed parsing.
//!
//! Feeds are deserialized with `quick-xml`'s serde support; unknown elements
//! are ignored so extension namespaces (`dc:`, `content:`, `media:`) pass through.
//! Links are returned as found; the caller resolves them against the source URL.

use crate::error::FetchError;
use crate::models::ArticleRecord;
use crate::utils::strip_html;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

/// Text construct. `type="html"` content is escaped markup; the default
/// `text` type is already plain.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "$text", default)]
    value: String,
}

impl AtomText {
    fn plain_text(&self) -> String {
        match self.kind.as_deref() {
            Some("html") | Some("xhtml") => strip_html(&self.value),
            _ => self.value.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    fn alternate_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .map(|l| l.href.as_str())
    }
}

/// Parse an RSS 2.0 document into records, in document order.
///
/// Titles are plain text; descriptions are HTML and get stripped.
pub fn parse_rss(body: &str, source_name: &str) -> Result<Vec<ArticleRecord>, FetchError> {
    let rss: Rss = quick_xml::de::from_str(body)?;
    Ok(rss
        .channel
        .items
        .into_iter()
        .map(|item| ArticleRecord {
            title: item.title.unwrap_or_default(),
            url: item.link.map(|l| l.trim().to_string()).unwrap_or_default(),
            snippet: item.description.map(|d| strip_html(&d)).unwrap_or_default(),
            source: source_name.to_string(),
            published: item.pub_date.as_deref().and_then(parse_rfc2822),
        })
        .collect())
}

/// Parse an Atom document into records, in document order.
pub fn parse_atom(body: &str, source_name: &str) -> Result<Vec<ArticleRecord>, FetchError> {
    let feed: AtomFeed = quick_xml::de::from_str(body)?;
    Ok(feed
        .entries
        .into_iter()
        .map(|entry| {
            let url = entry.alternate_link().unwrap_or_default().trim().to_string();
            let snippet = entry
                .summary
                .as_ref()
                .or(entry.content.as_ref())
                .map(AtomText::plain_text)
                .unwrap_or_default();
            let published = entry
                .published
                .as_deref()
                .or(entry.updated.as_deref())
                .and_then(parse_rfc3339);
            ArticleRecord {
                title: entry
                    .title
                    .as_ref()
                    .map(AtomText::plain_text)
                    .unwrap_or_default(),
                url,
                snippet,
                source: source_name.to_string(),
                published,
            }
        })
        .collect())
}

fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>AI News</title>
    <link>https://example.com</link>
    <item>
      <title>First model launch announced</title>
      <link>https://example.com/first</link>
      <description><![CDATA[<p>The <b>first</b> story.</p>]]></description>
      <pubDate>Sat, 17 Oct 2026 08:30:00 +0000</pubDate>
      <dc:creator>Reporter</dc:creator>
      <category>AI</category>
      <category>Models</category>
    </item>
    <item>
      <title>Second story &amp; more</title>
      <link>/second</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>The Verge AI</title>
  <entry>
    <title type="html">Chip makers race to ship accelerators</title>
    <link rel="self" href="https://example.com/self"/>
    <link rel="alternate" type="text/html" href="https://example.com/chips"/>
    <id>tag:example.com,2026:1</id>
    <published>2026-10-17T09:00:00-04:00</published>
    <summary type="html">&lt;p&gt;Accelerators &lt;em&gt;everywhere&lt;/em&gt; this year&lt;/p&gt;</summary>
  </entry>
  <entry>
    <title>Regulators publish new AI guidance</title>
    <link href="https://example.com/rules"/>
    <updated>2026-10-16T12:00:00Z</updated>
    <content type="html">Guidance text</content>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items_in_order() {
        let records = parse_rss(RSS, "AI News").unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].title, "First model launch announced");
        assert_eq!(records[0].url, "https://example.com/first");
        assert_eq!(records[0].snippet, "The first story.");
        assert_eq!(records[0].source, "AI News");
        assert_eq!(
            records[0].published,
            Some(Utc.with_ymd_and_hms(2026, 10, 17, 8, 30, 0).unwrap())
        );

        assert_eq!(records[1].title, "Second story & more");
        assert_eq!(records[1].url, "/second");
        assert_eq!(records[1].snippet, "");
        assert_eq!(records[1].published, None);
    }

    #[test]
    fn test_parse_atom_entries() {
        let records = parse_atom(ATOM, "The Verge AI").unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].title, "Chip makers race to ship accelerators");
        assert_eq!(records[0].url, "https://example.com/chips");
        assert_eq!(records[0].snippet, "Accelerators everywhere this year");
        assert_eq!(
            records[0].published,
            Some(Utc.with_ymd_and_hms(2026, 10, 17, 13, 0, 0).unwrap())
        );

        assert_eq!(records[1].url, "https://example.com/rules");
        assert_eq!(records[1].snippet, "Guidance text");
        assert_eq!(
            records[1].published,
            Some(Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_empty_channel() {
        let body = "<rss><channel><title>Nothing</title></channel></rss>";
        assert!(parse_rss(body, "Empty").unwrap().is_empty());
    }

    #[test]
    fn test_html_page_is_not_a_feed() {
        let body = "<html><body><p>Not a feed</p></body></html>";
        assert!(matches!(parse_rss(body, "Broken"), Err(FetchError::Feed(_))));
    }
    #[test]
    fn test_titles_keep_escaped_angle_brackets() {
        let rss = "<rss><channel><item>\
                   <title>Why &lt;T&gt; generics matter</title>\
                   <description>Open&lt;b&gt;AI&lt;/b&gt; weighs in</description>\
                   </item></channel></rss>";
        let records = parse_rss(rss, "AI News").unwrap();
        assert_eq!(records[0].title, "Why <T> generics matter");
        assert_eq!(records[0].snippet, "OpenAI weighs in");

        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <title>Vec&lt;u8&gt; tricks for parsers</title>
            <summary type="html">&lt;p&gt;Open&lt;b&gt;AI&lt;/b&gt; too&lt;/p&gt;</summary>
            </entry></feed>"#;
        let records = parse_atom(atom, "Feed").unwrap();
        assert_eq!(records[0].title, "Vec<u8> tricks for parsers");
        assert_eq!(records[0].snippet, "OpenAI too");
    }
}
