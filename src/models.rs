//! Data models for scraped articles, the generated digest and the outgoing email.
//!
//! Every value here lives for a single run:
//! - [`ArticleRecord`]: one item scraped from a news source
//! - [`DigestText`]: the LLM-written summary of all records
//! - [`EmailMessage`]: the rendered email handed to the mailer

use chrono::{DateTime, Utc};

/// A single news item as scraped from a source.
///
/// Records are produced by the fetcher in source-list order and are never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    /// Headline text.
    pub title: String,
    /// Absolute link to the full article (may be empty if the source gave none).
    pub url: String,
    /// Short plain-text teaser, already whitespace-collapsed and truncated.
    pub snippet: String,
    /// Display name of the source the record came from.
    pub source: String,
    /// Publication time, when the source exposes one.
    pub published: Option<DateTime<Utc>>,
}

/// The natural-language digest returned by the summarizer, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestText(pub String);

impl DigestText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DigestText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully rendered email, built once per run and sent once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub html_body: String,
    /// Plain-text alternative part for clients that do not render HTML.
    pub text_body: String,
    /// Recipients in the order they were configured.
    pub recipients: Vec<String>,
}
