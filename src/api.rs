//! LLM interaction: one Gemini `generateContent` call per run.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`GeminiClient`]: REST implementation against the Gemini API
//! - [`summarize`]: builds the digest prompt and asks exactly once
//!
//! No retry: network, auth and rate-limit failures end the run.

use crate::config::GeminiSettings;
use crate::error::SummarizationError;
use crate::models::{ArticleRecord, DigestText};
use crate::utils::truncate_for_log;
use itertools::Itertools;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to an LLM and return its response. The
/// pipeline is generic over this trait so tests can swap in a canned model.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send `text` to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, SummarizationError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if any.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Gemini REST client authenticated with an API key.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    settings: GeminiSettings,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.settings.model)
            .field("base_url", &self.settings.base_url)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: &str, settings: &GeminiSettings) -> Result<Self, SummarizationError> {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| SummarizationError::Network(e.to_string()))?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            settings: settings.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.settings.model)
        )
    }
}

impl AskAsync for GeminiClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.settings.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, SummarizationError> {
        let t0 = Instant::now();
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Gemini request failed");
                SummarizationError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = %status,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                body = %truncate_for_log(&body, 300),
                "Gemini API error"
            );
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SummarizationError::Auth {
                    status: status.as_u16(),
                    body,
                },
                StatusCode::TOO_MANY_REQUESTS => SummarizationError::RateLimited(body),
                _ => SummarizationError::Api {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| SummarizationError::Parse(e.to_string()))?;
        let text = parsed
            .into_text()
            .ok_or(SummarizationError::EmptyResponse)?;

        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = text.len(),
            "Gemini response received"
        );
        Ok(text)
    }
}

const PROMPT_HEADER: &str = "\
You are the editor of a daily AI news newsletter. Below are today's articles.
Write a concise digest for readers interested in AI developments:
- open with a two-sentence overview of the day's main themes;
- then cover the most important stories in a short paragraph each, naming the source;
- keep a professional, engaging tone and stay under 400 words;
- do not invent facts that are not in the articles.

Articles:
";

/// Build the single digest prompt from all articles, in order.
pub fn build_prompt(articles: &[ArticleRecord]) -> String {
    let listing = articles
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let mut entry = format!("{}. [{}] {}", i + 1, a.source, a.title);
            if !a.url.is_empty() {
                entry.push_str(&format!("\n   Link: {}", a.url));
            }
            if !a.snippet.is_empty() {
                entry.push_str(&format!("\n   {}", a.snippet));
            }
            entry
        })
        .join("\n");
    format!("{PROMPT_HEADER}{listing}\n\nDigest:\n")
}

/// Summarize all articles into one digest with a single LLM request.
///
/// The response text is returned verbatim.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub async fn summarize<A>(
    asker: &A,
    articles: &[ArticleRecord],
) -> Result<DigestText, SummarizationError>
where
    A: AskAsync<Response = String>,
{
    let t0 = Instant::now();
    let prompt = build_prompt(articles);
    debug!(prompt_chars = prompt.len(), "Built digest prompt");

    match asker.ask(&prompt).await {
        Ok(text) => {
            info!(
                elapsed_ms_total = t0.elapsed().as_millis() as u64,
                digest_chars = text.len(),
                "Summarization succeeded"
            );
            Ok(DigestText(text))
        }
        Err(e) => {
            error!(elapsed_ms_total = t0.elapsed().as_millis() as u64, error = %e, "Summarization failed");
            Err(e)
        }
    }
}
