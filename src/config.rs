//! Run configuration: secrets from the environment, tuning from an optional YAML file.
//!
//! Secrets (`GEMINI_API_KEY`, `EMAIL_USERNAME`, `EMAIL_PASSWORD`) are only ever
//! read from the process environment. Everything else lives in [`Settings`],
//! which has a default for every field so the settings file is optional.
//!
//! ```yaml
//! sources:
//!   - name: TechCrunch AI
//!     url: https://techcrunch.com/category/artificial-intelligence/feed/
//!     kind: rss
//! scraping:
//!   max_articles: 10
//! gemini:
//!   model: gemini-2.0-flash
//! email:
//!   recipients: [me@example.com]
//! ```

use crate::error::ConfigError;
use lettre::message::Mailbox;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, instrument};

pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_EMAIL_USERNAME: &str = "EMAIL_USERNAME";
pub const ENV_EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";
pub const ENV_RECIPIENTS: &str = "EMAIL_RECIPIENTS";

/// How a source's response body is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rss,
    Atom,
    Html,
}

/// CSS selector rules for an HTML source.
///
/// `title`, `link` and `snippet` are evaluated inside each element matched by `item`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HtmlSelectors {
    pub item: String,
    pub title: String,
    pub link: String,
    pub snippet: String,
}

impl Default for HtmlSelectors {
    fn default() -> Self {
        Self {
            item: "article".to_string(),
            title: "h1, h2, h3, h4".to_string(),
            link: "a[href]".to_string(),
            snippet: "p".to_string(),
        }
    }
}

/// One configured news origin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Only consulted for [`SourceKind::Html`].
    #[serde(default)]
    pub selectors: HtmlSelectors,
}

impl SourceConfig {
    pub fn new(name: &str, url: &str, kind: SourceKind) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            kind,
            enabled: true,
            selectors: HtmlSelectors::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrapingSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Cap applied to each source before concatenation.
    pub max_articles_per_source: usize,
    /// Cap applied to the concatenated list, keeping source order.
    pub max_articles: usize,
    /// Dated records older than this are dropped; undated records are kept.
    pub hours_lookback: i64,
    /// Pause between consecutive source requests.
    pub rate_limit_delay_ms: u64,
    pub snippet_chars: usize,
}

impl Default for ScrapingSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "AI-News-Agent/1.0".to_string(),
            max_articles_per_source: 10,
            max_articles: 20,
            hours_lookback: 24,
            rate_limit_delay_ms: 2000,
            snippet_chars: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.3,
            max_output_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub subject_prefix: String,
    pub sender_name: String,
    pub recipients: Vec<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            subject_prefix: "Daily AI News Digest".to_string(),
            sender_name: "AI News Agent".to_string(),
            recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Non-secret tuning for a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sources: Vec<SourceConfig>,
    pub scraping: ScrapingSettings,
    pub gemini: GeminiSettings,
    pub email: EmailSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            scraping: ScrapingSettings::default(),
            gemini: GeminiSettings::default(),
            email: EmailSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "AI News",
            "https://www.artificialintelligence-news.com/feed/",
            SourceKind::Rss,
        ),
        SourceConfig::new(
            "The Verge AI",
            "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml",
            SourceKind::Atom,
        ),
        SourceConfig::new(
            "TechCrunch AI",
            "https://techcrunch.com/category/artificial-intelligence/feed/",
            SourceKind::Rss,
        ),
    ]
}

impl Settings {
    /// Load settings from `path`, or return the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Sources that are not switched off, in configured order.
    pub fn enabled_sources(&self) -> Vec<SourceConfig> {
        self.sources.iter().filter(|s| s.enabled).cloned().collect()
    }
}

/// Credentials and recipients for one run. Read-only once loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub api_key: String,
    pub email_username: String,
    pub email_password: String,
    pub recipients: Vec<String>,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("api_key", &"<redacted>")
            .field("email_username", &self.email_username)
            .field("email_password", &"<redacted>")
            .field("recipients", &self.recipients)
            .finish()
    }
}

impl RunConfig {
    /// Build from the process environment.
    pub fn from_env(settings: &Settings) -> Result<Self, ConfigError> {
        Self::from_lookup(settings, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// Blank values count as missing. Recipients come from `EMAIL_RECIPIENTS`
    /// (comma-separated), then `email.recipients` in the settings, then fall
    /// back to the sending account itself.
    #[instrument(level = "debug", skip_all)]
    pub fn from_lookup<F>(settings: &Settings, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };

        let api_key = required(ENV_API_KEY)?;
        let email_username = required(ENV_EMAIL_USERNAME)?;
        let email_password = required(ENV_EMAIL_PASSWORD)?;

        let mut recipients: Vec<String> = match lookup(ENV_RECIPIENTS) {
            Some(list) if !list.trim().is_empty() => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => settings.email.recipients.clone(),
        };
        if recipients.is_empty() {
            recipients.push(email_username.clone());
        }

        for address in &recipients {
            address
                .parse::<Mailbox>()
                .map_err(|e| ConfigError::InvalidRecipient {
                    address: address.clone(),
                    reason: e.to_string(),
                })?;
        }
        debug!(recipients = recipients.len(), "Loaded run configuration");

        Ok(Self {
            api_key,
            email_username,
            email_password,
            recipients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            (ENV_API_KEY, "key-123"),
            (ENV_EMAIL_USERNAME, "bot@example.com"),
            (ENV_EMAIL_PASSWORD, "app-password"),
        ])
    }

    fn load(vars: &HashMap<String, String>) -> Result<RunConfig, ConfigError> {
        RunConfig::from_lookup(&Settings::default(), |k| vars.get(k).cloned())
    }

    #[test]
    fn test_complete_environment_loads() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.api_key, "key-123");
        assert_eq!(config.email_username, "bot@example.com");
        assert_eq!(config.email_password, "app-password");
    }

    #[test]
    fn test_each_missing_variable_is_reported_by_name() {
        for missing in [ENV_API_KEY, ENV_EMAIL_USERNAME, ENV_EMAIL_PASSWORD] {
            let mut vars = full_env();
            vars.remove(missing);
            match load(&vars) {
                Err(ConfigError::MissingVar(name)) => assert_eq!(name, missing),
                other => panic!("expected MissingVar({missing}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_blank_variable_counts_as_missing() {
        let mut vars = full_env();
        vars.insert(ENV_EMAIL_PASSWORD.to_string(), "   ".to_string());
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingVar(ENV_EMAIL_PASSWORD))
        ));
    }

    #[test]
    fn test_recipients_default_to_sender() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.recipients, vec!["bot@example.com".to_string()]);
    }

    #[test]
    fn test_recipients_from_env_override_settings() {
        let mut settings = Settings::default();
        settings.email.recipients = vec!["settings@example.com".to_string()];
        let mut vars = full_env();
        vars.insert(
            ENV_RECIPIENTS.to_string(),
            " a@x.com, b@x.com ,".to_string(),
        );

        let config = RunConfig::from_lookup(&settings, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.recipients, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_recipients_from_settings() {
        let mut settings = Settings::default();
        settings.email.recipients = vec!["settings@example.com".to_string()];
        let vars = full_env();

        let config = RunConfig::from_lookup(&settings, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.recipients, vec!["settings@example.com"]);
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let mut vars = full_env();
        vars.insert(ENV_RECIPIENTS.to_string(), "not-an-address".to_string());
        assert!(matches!(
            load(&vars),
            Err(ConfigError::InvalidRecipient { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&full_env()).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("key-123"));
        assert!(!printed.contains("app-password"));
        assert!(printed.contains("bot@example.com"));
    }

    #[test]
    fn test_default_settings_have_enabled_sources() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.enabled_sources().len(), 3);
        assert_eq!(settings.email.smtp_port, 587);
    }

    #[test]
    fn test_settings_file_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
sources:
  - name: Example
    url: https://example.com/news
    kind: html
    selectors:
      item: ".story"
  - name: Disabled
    url: https://example.com/feed
    kind: rss
    enabled: false
scraping:
  max_articles: 5
gemini:
  model: gemini-1.5-pro
logging:
  level: debug
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        let sources = settings.enabled_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].kind, SourceKind::Html);
        assert_eq!(sources[0].selectors.item, ".story");
        assert_eq!(sources[0].selectors.title, "h1, h2, h3, h4");
        assert_eq!(settings.scraping.max_articles, 5);
        assert_eq!(settings.scraping.timeout_secs, 30);
        assert_eq!(settings.gemini.model, "gemini-1.5-pro");
        assert_eq!(settings.email.subject_prefix, "Daily AI News Digest");
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_malformed_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "sources: [{{name: 1").unwrap();
        assert!(matches!(
            Settings::load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_settings_file() {
        let result = Settings::load(Some(Path::new("/definitely/not/here.yaml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
