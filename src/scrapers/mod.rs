//! News fetching: one GET per configured source, parsed into [`ArticleRecord`]s.
//!
//! # Supported source kinds
//!
//! | Kind | Module | Notes |
//! |------|--------|-------|
//! | `rss` | [`feed`] | RSS 2.0 `channel/item` |
//! | `atom` | [`feed`] | Atom `feed/entry`, alternate link preferred |
//! | `html` | [`html`] | CSS selector rules per source |
//!
//! Sources are fetched one after another in configured order. A source that
//! fails (network error, non-2xx status, unparseable body) is logged and
//! skipped; the run only fails when no source yields any record.

pub mod feed;
pub mod html;

use crate::config::{ScrapingSettings, SourceConfig, SourceKind};
use crate::error::FetchError;
use crate::models::ArticleRecord;
use crate::utils::{collapse_whitespace, truncate_chars};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use std::time::Duration as StdDuration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Headlines shorter than this are navigation links, not stories.
const MIN_TITLE_CHARS: usize = 10;

/// Build the HTTP client used for every source in a run.
pub fn build_client(settings: &ScrapingSettings) -> Result<Client, FetchError> {
    let client = Client::builder()
        .timeout(StdDuration::from_secs(settings.timeout_secs))
        .user_agent(settings.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Fetch every source in order and concatenate the results.
///
/// # Returns
///
/// All records in source-list order, capped at `max_articles`, or
/// [`FetchError::NoContent`] if nothing at all was collected.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn fetch_all(
    client: &Client,
    sources: &[SourceConfig],
    settings: &ScrapingSettings,
) -> Result<Vec<ArticleRecord>, FetchError> {
    let now = Utc::now();
    let mut articles = Vec::new();

    for (i, source) in sources.iter().enumerate() {
        if i > 0 && settings.rate_limit_delay_ms > 0 {
            sleep(StdDuration::from_millis(settings.rate_limit_delay_ms)).await;
        }

        match fetch_source(client, source, settings, now).await {
            Ok(records) if records.is_empty() => {
                warn!(source = %source.name, "Source yielded no articles");
            }
            Ok(records) => {
                info!(source = %source.name, count = records.len(), "Fetched source");
                articles.extend(records);
            }
            Err(e) => {
                warn!(source = %source.name, url = %source.url, error = %e, "Source failed; skipping");
            }
        }
    }

    if articles.len() > settings.max_articles {
        debug!(
            total = articles.len(),
            max = settings.max_articles,
            "Truncating article list"
        );
        articles.truncate(settings.max_articles);
    }

    if articles.is_empty() {
        return Err(FetchError::NoContent);
    }
    info!(count = articles.len(), "Total articles collected");
    Ok(articles)
}

/// Fetch and parse a single source, applying the per-record filters.
#[instrument(level = "info", skip_all, fields(source = %source.name, url = %source.url))]
pub async fn fetch_source(
    client: &Client,
    source: &SourceConfig,
    settings: &ScrapingSettings,
    now: DateTime<Utc>,
) -> Result<Vec<ArticleRecord>, FetchError> {
    let base = Url::parse(&source.url).map_err(|e| FetchError::Url {
        url: source.url.clone(),
        source: e,
    })?;

    let response = client.get(base.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    let body = response.text().await?;
    debug!(bytes = body.len(), "Downloaded source body");

    let parsed = match source.kind {
        SourceKind::Rss => feed::parse_rss(&body, &source.name)?,
        SourceKind::Atom => feed::parse_atom(&body, &source.name)?,
        SourceKind::Html => html::parse_html(&body, &source.selectors, &source.name)?,
    };
    let parsed_count = parsed.len();

    let cutoff = lookback_cutoff(now, settings.hours_lookback);
    let records: Vec<ArticleRecord> = parsed
        .into_iter()
        .filter_map(|record| finalize(record, &base, cutoff, settings.snippet_chars))
        .take(settings.max_articles_per_source)
        .collect();

    info!(
        parsed = parsed_count,
        kept = records.len(),
        "Parsed source"
    );
    Ok(records)
}

/// Oldest publication time still accepted, or `None` when the lookback
/// reaches past the representable range.
fn lookback_cutoff(now: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    let cutoff = TimeDelta::try_hours(hours).and_then(|window| now.checked_sub_signed(window));
    if cutoff.is_none() {
        debug!(hours, "Lookback out of range; not filtering by date");
    }
    cutoff
}

/// Normalize one parsed record, or drop it if it fails the filters.
///
/// Drops records with short titles and dated records older than `cutoff`;
/// resolves relative links against `base`; trims the snippet.
fn finalize(
    mut record: ArticleRecord,
    base: &Url,
    cutoff: Option<DateTime<Utc>>,
    snippet_chars: usize,
) -> Option<ArticleRecord> {
    record.title = collapse_whitespace(&record.title);
    if record.title.chars().count() < MIN_TITLE_CHARS {
        return None;
    }
    if record
        .published
        .zip(cutoff)
        .is_some_and(|(published, cutoff)| published < cutoff)
    {
        debug!(title = %record.title, "Dropping stale article");
        return None;
    }
    if !record.url.is_empty() {
        record.url = base
            .join(&record.url)
            .map(|u| u.to_string())
            .unwrap_or(record.url);
    }
    record.snippet = truncate_chars(&collapse_whitespace(&record.snippet), snippet_chars);
    Some(record)
}
