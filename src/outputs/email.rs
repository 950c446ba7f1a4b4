//! Rendering the digest into an HTML email with a plain-text alternative.
//!
//! The digest text comes straight from the LLM, so it is HTML-escaped before
//! it is placed in the template. Blank lines become paragraph breaks, single
//! newlines become `<br>`, and `**bold**` spans are kept as `<strong>`.

use crate::config::EmailSettings;
use crate::models::{ArticleRecord, DigestText, EmailMessage};
use crate::utils::escape_html;
use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;
use tracing::{info, instrument};

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

const STYLE: &str = r#"
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; background-color: #f9f9f9; }
        .container { background-color: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        .header { text-align: center; border-bottom: 3px solid #007acc; padding-bottom: 20px; margin-bottom: 30px; }
        .header h1 { color: #007acc; margin: 0; font-size: 28px; }
        .date { color: #666; font-size: 16px; margin-top: 5px; }
        .digest p { font-size: 16px; color: #444; }
        .sources { margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; font-size: 14px; }
        .sources a { color: #007acc; text-decoration: none; }
        .source-name { color: #888; }
        .footer { margin-top: 40px; padding-top: 20px; border-top: 1px solid #eee; text-align: center; color: #666; font-size: 14px; }
"#;

/// Long-form run date without zero padding, e.g. `October 8, 2026`.
const DATE_FORMAT: &str = "%B %-d, %Y";

/// Subject line for a run on `date`, e.g. `Daily AI News Digest – October 18, 2026`.
pub fn subject_line(prefix: &str, date: NaiveDate) -> String {
    format!("{} – {}", prefix, date.format(DATE_FORMAT))
}

/// Convert digest text into escaped HTML paragraphs.
fn digest_to_html(digest: &str) -> String {
    PARAGRAPH_BREAK
        .split(digest.trim())
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            let escaped = escape_html(p.trim());
            let bolded = BOLD.replace_all(&escaped, "<strong>$1</strong>");
            format!("<p>{}</p>", bolded.replace('\n', "<br>\n"))
        })
        .join("\n")
}

fn sources_html(articles: &[ArticleRecord]) -> String {
    let mut html = String::new();
    for article in articles {
        let title = escape_html(&article.title);
        let source = escape_html(&article.source);
        if article.url.is_empty() {
            let _ = writeln!(
                html,
                r#"<li>{title} <span class="source-name">({source})</span></li>"#
            );
        } else {
            let _ = writeln!(
                html,
                r#"<li><a href="{}" target="_blank">{title}</a> <span class="source-name">({source})</span></li>"#,
                escape_html(&article.url)
            );
        }
    }
    html
}

fn html_body(
    digest: &DigestText,
    articles: &[ArticleRecord],
    date: &str,
    settings: &EmailSettings,
) -> String {
    let title = escape_html(&settings.subject_prefix);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{title}</h1>
            <div class="date">{date}</div>
        </div>
        <div class="digest">
{digest}
        </div>
        <div class="sources">
            <h3>Sources</h3>
            <ul>
{sources}            </ul>
        </div>
        <div class="footer">
            <p>Stay informed and ahead of the curve!</p>
            <p><strong>{sender}</strong></p>
        </div>
    </div>
</body>
</html>
"#,
        digest = digest_to_html(digest.as_str()),
        sources = sources_html(articles),
        sender = escape_html(&settings.sender_name),
    )
}

fn text_body(
    digest: &DigestText,
    articles: &[ArticleRecord],
    date: &str,
    settings: &EmailSettings,
) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "{} - {}\n", settings.subject_prefix.to_uppercase(), date);
    let _ = writeln!(text, "{}\n", digest.as_str().trim());
    let _ = writeln!(text, "{}", "=".repeat(60));
    let _ = writeln!(text, "Sources:\n");
    for (i, article) in articles.iter().enumerate() {
        let _ = writeln!(text, "{}. {} ({})", i + 1, article.title, article.source);
        if !article.url.is_empty() {
            let _ = writeln!(text, "   {}", article.url);
        }
    }
    let _ = writeln!(text, "\nStay informed and ahead of the curve!\n\n{}", settings.sender_name);
    text
}

/// Build the run's single [`EmailMessage`].
#[instrument(level = "info", skip_all, fields(%date, recipients = recipients.len()))]
pub fn format_email(
    digest: &DigestText,
    articles: &[ArticleRecord],
    recipients: &[String],
    date: NaiveDate,
    settings: &EmailSettings,
) -> EmailMessage {
    let display_date = date.format(DATE_FORMAT).to_string();
    let message = EmailMessage {
        subject: subject_line(&settings.subject_prefix, date),
        html_body: html_body(digest, articles, &display_date, settings),
        text_body: text_body(digest, articles, &display_date, settings),
        recipients: recipients.to_vec(),
    };
    info!(
        subject = %message.subject,
        html_bytes = message.html_body.len(),
        "Email formatted"
    );
    message
}

/// A fixed message for checking SMTP credentials without running the pipeline.
pub fn test_message(recipients: &[String], settings: &EmailSettings) -> EmailMessage {
    let sender = escape_html(&settings.sender_name);
    EmailMessage {
        subject: format!("{} - Test Email", settings.sender_name),
        html_body: format!(
            "<html><body><h2>{sender} Test</h2>\
             <p>This is a test email to verify that your SMTP settings are configured correctly.</p>\
             <p>If you're receiving this, everything is working properly!</p>\
             <p><strong>{sender}</strong></p></body></html>"
        ),
        text_body: format!(
            "{0} Test\n\nThis is a test email to verify that your SMTP settings are configured correctly.\n\n\
             If you're receiving this, everything is working properly!\n\n{0}\n",
            settings.sender_name
        ),
        recipients: recipients.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn articles() -> Vec<ArticleRecord> {
        vec![
            ArticleRecord {
                title: "Chips & accelerators".to_string(),
                url: "https://example.com/chips?a=1&b=2".to_string(),
                snippet: String::new(),
                source: "The Verge AI".to_string(),
                published: None,
            },
            ArticleRecord {
                title: "Guidance without a link".to_string(),
                url: String::new(),
                snippet: String::new(),
                source: "AI News".to_string(),
                published: None,
            },
        ]
    }

    #[test]
    fn test_subject_line() {
        assert_eq!(
            subject_line("Daily AI News Digest", date()),
            "Daily AI News Digest – October 18, 2026"
        );
        assert_eq!(
            subject_line("Daily AI News Digest", NaiveDate::from_ymd_opt(2026, 10, 8).unwrap()),
            "Daily AI News Digest – October 8, 2026"
        );
    }

    #[test]
    fn test_format_email_fields() {
        let recipients = vec!["a@x.com".to_string(), "b@x.com".to_string()];
        let message = format_email(
            &DigestText("Digest A".to_string()),
            &articles(),
            &recipients,
            date(),
            &EmailSettings::default(),
        );

        assert_eq!(message.subject, "Daily AI News Digest – October 18, 2026");
        assert_eq!(message.recipients, recipients);
        assert!(message.html_body.contains("<p>Digest A</p>"));
        assert!(message.html_body.contains("October 18, 2026"));
        assert!(message.html_body.contains("<strong>AI News Agent</strong>"));
        assert!(message.text_body.contains("Digest A"));
        assert!(message.text_body.contains("1. Chips & accelerators (The Verge AI)"));
        assert!(message.text_body.contains("https://example.com/chips?a=1&b=2"));
    }

    #[test]
    fn test_sources_are_escaped_and_linked() {
        let html = sources_html(&articles());
        assert!(html.contains(r#"href="https://example.com/chips?a=1&amp;b=2""#));
        assert!(html.contains("Chips &amp; accelerators"));
        assert!(html.contains(r#"<li>Guidance without a link <span class="source-name">(AI News)</span></li>"#));
    }

    #[test]
    fn test_digest_paragraphs_and_escaping() {
        let html = digest_to_html("**Top story**: <script>x</script>\nsecond line\n\n\nNext paragraph");
        assert_eq!(
            html,
            "<p><strong>Top story</strong>: &lt;script&gt;x&lt;/script&gt;<br>\nsecond line</p>\n<p>Next paragraph</p>"
        );
    }

    #[test]
    fn test_test_message() {
        let message = test_message(&["a@x.com".to_string()], &EmailSettings::default());
        assert_eq!(message.subject, "AI News Agent - Test Email");
        assert_eq!(message.recipients, vec!["a@x.com"]);
        assert!(message.html_body.contains("AI News Agent Test"));
    }
}
