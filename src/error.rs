//! Error types for each pipeline stage.
//!
//! Only [`FetchError`] is ever recovered from, and only per source: the
//! fetcher logs it and moves on to the next source. Everything that reaches
//! [`PipelineError`] ends the run with a non-zero exit.

use std::path::PathBuf;
use thiserror::Error;

/// Missing or invalid configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("invalid recipient address {address:?}: {reason}")]
    InvalidRecipient { address: String, reason: String },

    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failure to fetch or parse one source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("source responded with HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid source url {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid CSS selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("malformed feed: {0}")]
    Feed(#[from] quick_xml::DeError),

    /// Every configured source failed or yielded nothing.
    #[error("no content available from any configured source")]
    NoContent,
}

/// Failure talking to the LLM endpoint. Always fatal, never retried.
#[derive(Debug, Error)]
pub enum SummarizationError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication rejected (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    #[error("rate limited by the LLM API: {0}")]
    RateLimited(String),

    #[error("LLM API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    #[error("LLM returned no text")]
    EmptyResponse,
}

/// Failure building or transmitting the email. Always fatal.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build email: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// Top-level error carried to the process boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("summarization error: {0}")]
    Summarization(#[from] SummarizationError),

    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}
