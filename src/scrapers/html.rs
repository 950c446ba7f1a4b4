//! Selector-driven HTML scraping.
//!
//! Each element matched by the `item` selector becomes one record. Within it
//! the first `title` match gives the headline; the link is the title itself
//! when it is an anchor, else the first `link` match inside the title, else
//! the first `link` match anywhere in the item.

use crate::config::HtmlSelectors;
use crate::error::FetchError;
use crate::models::ArticleRecord;
use crate::utils::visible_text;
use scraper::{Html, Selector};

fn compile(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|e| FetchError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Parse an HTML page into records using the source's selector rules.
///
/// Items without a title match are skipped. Links are returned unresolved.
pub fn parse_html(
    body: &str,
    selectors: &HtmlSelectors,
    source_name: &str,
) -> Result<Vec<ArticleRecord>, FetchError> {
    let item_selector = compile(&selectors.item)?;
    let title_selector = compile(&selectors.title)?;
    let link_selector = compile(&selectors.link)?;
    let snippet_selector = compile(&selectors.snippet)?;

    let document = Html::parse_document(body);
    let mut records = Vec::new();

    for item in document.select(&item_selector) {
        let Some(title_element) = item.select(&title_selector).next() else {
            continue;
        };

        let link_element = if title_element.value().name() == "a" {
            Some(title_element)
        } else {
            title_element
                .select(&link_selector)
                .next()
                .or_else(|| item.select(&link_selector).next())
        };
        let url = link_element
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .unwrap_or_default();

        let snippet = item
            .select(&snippet_selector)
            .next()
            .map(visible_text)
            .unwrap_or_default();

        records.push(ArticleRecord {
            title: visible_text(title_element),
            url,
            snippet,
            source: source_name.to_string(),
            published: None,
        });
    }

    Ok(records)
}
