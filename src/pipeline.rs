//! The daily run: fetch → summarize → format → send, strictly in that order.
//!
//! Each stage starts only after the previous one has finished, and the first
//! fatal error ends the run. Nothing is persisted between stages or runs.

use crate::api::{self, AskAsync};
use crate::cli::Cli;
use crate::config::{RunConfig, Settings};
use crate::error::PipelineError;
use crate::mailer::{Mailer, StdoutMailer};
use crate::outputs::email;
use crate::scrapers;
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Instant;
use tracing::{info, instrument};

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub articles: usize,
    pub recipients: usize,
    pub subject: String,
}

/// Pick the run mode from the CLI flags.
///
/// `--test-email` sends the fixed test message through `mailer` and touches
/// neither the sources nor the LLM. `--dry-run` runs every stage but hands
/// the message to [`StdoutMailer`] instead of `mailer`.
pub async fn dispatch<A, M>(
    args: &Cli,
    settings: &Settings,
    config: &RunConfig,
    client: &Client,
    asker: &A,
    mailer: &M,
    date: NaiveDate,
) -> Result<RunSummary, PipelineError>
where
    A: AskAsync<Response = String>,
    M: Mailer,
{
    if args.test_email {
        let message = email::test_message(&config.recipients, &settings.email);
        mailer.send(&message).await?;
        info!(recipients = message.recipients.len(), "Test email sent");
        return Ok(RunSummary {
            articles: 0,
            recipients: message.recipients.len(),
            subject: message.subject,
        });
    }

    if args.dry_run {
        run(settings, config, client, asker, &StdoutMailer, date).await
    } else {
        run(settings, config, client, asker, mailer, date).await
    }
}

/// Execute one run against the given LLM and mailer.
///
/// `date` is the calendar date stamped into the subject and header.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn run<A, M>(
    settings: &Settings,
    config: &RunConfig,
    client: &Client,
    asker: &A,
    mailer: &M,
    date: NaiveDate,
) -> Result<RunSummary, PipelineError>
where
    A: AskAsync<Response = String>,
    M: Mailer,
{
    let start_time = Instant::now();
    info!("Starting daily news run");

    let sources = settings.enabled_sources();
    let stage = Instant::now();
    let articles = scrapers::fetch_all(client, &sources, &settings.scraping).await?;
    info!(
        count = articles.len(),
        elapsed_ms = stage.elapsed().as_millis() as u64,
        "Fetch stage complete"
    );

    let stage = Instant::now();
    let digest = api::summarize(asker, &articles).await?;
    info!(
        elapsed_ms = stage.elapsed().as_millis() as u64,
        "Summarize stage complete"
    );

    let message = email::format_email(
        &digest,
        &articles,
        &config.recipients,
        date,
        &settings.email,
    );

    let stage = Instant::now();
    mailer.send(&message).await?;
    info!(
        elapsed_ms = stage.elapsed().as_millis() as u64,
        "Send stage complete"
    );

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        articles = articles.len(),
        recipients = message.recipients.len(),
        "Run complete"
    );

    Ok(RunSummary {
        articles: articles.len(),
        recipients: message.recipients.len(),
        subject: message.subject,
    })
}
