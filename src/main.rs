//! # Daily News Digest
//!
//! Scrapes the day's AI news from a list of feeds and pages, asks Gemini for
//! a single digest of everything found, and emails that digest over SMTP.
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... EMAIL_USERNAME=me@gmail.com EMAIL_PASSWORD=... daily_news_digest
//! ```
//!
//! ## Architecture
//!
//! One linear run per invocation, on a single thread:
//! 1. **Fetching**: GET each configured source, parse RSS/Atom/HTML into articles
//! 2. **Summarizing**: one Gemini request covering every article
//! 3. **Formatting**: wrap the digest in the HTML email template
//! 4. **Sending**: one authenticated SMTP session to all recipients
//!
//! The daily cadence comes from an external scheduler (e.g. a CI cron job).
//! Exit status is 0 on success and 1 on any fatal error.

use chrono::Local;
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod mailer;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use api::GeminiClient;
use cli::Cli;
use config::{RunConfig, Settings};
use error::PipelineError;
use mailer::SmtpMailer;

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // .env is optional and never overrides variables already set.
    let dotenv = dotenvy::dotenv();
    let args = Cli::parse();

    let settings = match Settings::load(args.config_path().as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            init_tracing("info");
            error!(error = %e, "Failed to load settings");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings.logging.level);
    debug!(?args, dotenv = ?dotenv.ok(), "Parsed CLI arguments");

    match run(&args, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Cli, settings: &Settings) -> Result<(), PipelineError> {
    let config = RunConfig::from_env(settings)?;
    info!(
        sources = settings.enabled_sources().len(),
        recipients = config.recipients.len(),
        model = %settings.gemini.model,
        "Configuration loaded"
    );

    let smtp = SmtpMailer::new(&config, &settings.email)?;
    debug!(from = %smtp.from_mailbox(), "SMTP sender configured");
    let client = scrapers::build_client(&settings.scraping)?;
    let gemini = GeminiClient::new(&config.api_key, &settings.gemini)?;
    let today = Local::now().date_naive();

    let summary =
        pipeline::dispatch(args, settings, &config, &client, &gemini, &smtp, today).await?;
    info!(
        articles = summary.articles,
        recipients = summary.recipients,
        subject = %summary.subject,
        dry_run = args.dry_run,
        test_email = args.test_email,
        "Daily digest complete"
    );
    Ok(())
}
