//! Command-line interface definitions.
//!
//! No argument is required: a bare invocation runs the full pipeline once,
//! which is what the daily cron trigger does. Secrets never go on the command
//! line; they come from the environment (see [`crate::config`]).

use clap::Parser;
use std::path::{Path, PathBuf};

/// Settings file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Fetch the day's AI news, summarize it with Gemini and email the digest.
///
/// # Examples
///
/// ```sh
/// # Full run (what the scheduler invokes)
/// daily_news_digest
///
/// # Render the email to stdout without sending it
/// daily_news_digest --dry-run
///
/// # Verify SMTP credentials only
/// daily_news_digest --test-email
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, env = "NEWS_DIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fetch and summarize, then print the email instead of sending it
    #[arg(long, conflicts_with = "test_email")]
    pub dry_run: bool,

    /// Send a fixed test email to the configured recipients and exit
    #[arg(long)]
    pub test_email: bool,
}

impl Cli {
    /// The settings file to load: `--config` if given, else the default path if it exists.
    pub fn config_path(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                default.exists().then(|| default.to_path_buf())
            }
        }
    }
}
