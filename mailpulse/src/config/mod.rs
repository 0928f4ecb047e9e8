//! Configuration management for mailpulse
//!
//! Configuration is a single typed structure, loaded once at startup and
//! injected into each component. Sources, in order of precedence:
//!
//! 1. Environment variables (highest priority, `MAILPULSE_` prefix, `__`
//!    separates sections: `MAILPULSE_PROVIDER__API_KEY`)
//! 2. The TOML file passed to [`MailpulseConfig::load_from`], or
//!    `./mailpulse.toml` for [`MailpulseConfig::load`]
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! [provider]
//! api_key = "em_live_..."
//! base_url = "https://api.emailit.com/v1"
//! requests_per_minute = 60
//!
//! [sender]
//! default_address = "noreply@example.com"
//! default_name = "Example"
//! default_reply_to = "support@example.com"
//! alert_recipients = ["ops@example.com"]
//!
//! [tracking]
//! public_base_url = "https://mail.example.com"
//! database_url = "sqlite://./tracking.db?mode=rwc"
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use mailpulse::config::MailpulseConfig;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = MailpulseConfig::load()?;
//! config.validate()?;
//!
//! let interval = config.provider.min_interval();
//! # Ok(())
//! # }
//! ```

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default configuration file looked up by [`MailpulseConfig::load`]
pub const DEFAULT_CONFIG_FILE: &str = "mailpulse.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MAILPULSE_";

/// Delivery provider settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Bearer credential for the delivery API
    pub api_key: String,

    /// Base URL of the delivery API, endpoints are appended to it
    pub base_url: String,

    /// Upper bound on outbound requests per minute
    pub requests_per_minute: u32,

    /// Timeout applied to every outbound request, in seconds
    pub request_timeout_secs: u64,

    /// Delay used when a 429 response carries no usable `Retry-After`
    pub default_retry_after_secs: u64,

    /// How many times a rate-limited request is re-issued before giving up
    pub max_rate_limit_retries: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.emailit.com/v1".to_string(),
            requests_per_minute: 60,
            request_timeout_secs: 30,
            default_retry_after_secs: 5,
            max_rate_limit_retries: 1,
        }
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("default_retry_after_secs", &self.default_retry_after_secs)
            .field("max_rate_limit_retries", &self.max_rate_limit_retries)
            .finish()
    }
}

impl ProviderSettings {
    /// Minimum spacing between two outbound requests
    ///
    /// A limit of zero disables throttling.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        if self.requests_per_minute == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(60) / self.requests_per_minute
    }

    /// Per-request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Fallback delay for 429 responses
    #[must_use]
    pub const fn default_retry_after(&self) -> Duration {
        Duration::from_secs(self.default_retry_after_secs)
    }
}

/// Sender defaults and alerting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderSettings {
    /// Address used when a send request has no `from_address`
    pub default_address: String,

    /// Display name used when a send request has no `from_name`
    pub default_name: String,

    /// Reply-To used when a send request has none
    pub default_reply_to: String,

    /// Recipients of system alerts
    ///
    /// Accepts a list or a comma-separated string, so it can be set from a
    /// single environment variable.
    #[serde(deserialize_with = "list_or_csv")]
    pub alert_recipients: Vec<String>,
}

/// Template engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directory the named email templates are loaded from
    pub template_dir: PathBuf,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("./templates"),
        }
    }
}

/// Open tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    /// Public origin the pixel route is reachable under
    pub public_base_url: String,

    /// SQLite URL for tracking records, in-memory store when unset
    pub database_url: Option<String>,

    /// Take the opener IP from the first `X-Forwarded-For` hop
    pub trust_forwarded_for: bool,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            public_base_url: "http://127.0.0.1:3000".to_string(),
            database_url: None,
            trust_forwarded_for: false,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the inbound adapter binds to
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Complete mailpulse configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MailpulseConfig {
    /// Delivery provider settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Sender defaults
    #[serde(default)]
    pub sender: SenderSettings,

    /// Template settings
    #[serde(default)]
    pub templates: TemplateSettings,

    /// Open tracking settings
    #[serde(default)]
    pub tracking: TrackingSettings,

    /// Server settings
    #[serde(default)]
    pub server: ServerSettings,
}

/// A single configuration problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted key of the offending setting
    pub key: &'static str,
    /// What is wrong with it
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// One or more settings are missing or invalid
    #[error("invalid configuration: {}", join_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

impl ConfigError {
    /// Issues carried by an [`ConfigError::Invalid`] error
    #[must_use]
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            Self::Invalid(issues) => issues,
            Self::Load(_) => &[],
        }
    }
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl MailpulseConfig {
    /// Load configuration from `./mailpulse.toml` (if present) and the environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a source cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file and the environment
    ///
    /// A missing file is not an error; the defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a source cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::figment(path.as_ref()).extract().map_err(Box::new).map_err(Into::into)
    }

    /// The layered figment used by the loaders
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check that every required setting is present and sane
    ///
    /// All problems are collected and returned together.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();
        let mut require = |key: &'static str, value: &str| {
            if value.trim().is_empty() {
                issues.push(ConfigIssue {
                    key,
                    message: "must be set".to_string(),
                });
            }
        };

        require("provider.api_key", &self.provider.api_key);
        require("sender.default_address", &self.sender.default_address);
        require("sender.default_name", &self.sender.default_name);
        require("sender.default_reply_to", &self.sender.default_reply_to);

        if let Err(e) = reqwest::Url::parse(&self.provider.base_url) {
            issues.push(ConfigIssue {
                key: "provider.base_url",
                message: format!("not a valid URL: {e}"),
            });
        }
        if self.provider.requests_per_minute == 0 {
            issues.push(ConfigIssue {
                key: "provider.requests_per_minute",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.provider.request_timeout_secs == 0 {
            issues.push(ConfigIssue {
                key: "provider.request_timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }

        if self.sender.alert_recipients.is_empty() {
            tracing::warn!(
                "sender.alert_recipients is not set; system alerts will go to the default sender"
            );
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }
}

fn list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Csv(String),
    }

    let items = match Raw::deserialize(deserializer)? {
        Raw::List(list) => list,
        Raw::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    };

    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> MailpulseConfig {
        let mut config = MailpulseConfig::default();
        config.provider.api_key = "key".to_string();
        config.sender.default_address = "noreply@example.com".to_string();
        config.sender.default_name = "Example".to_string();
        config.sender.default_reply_to = "support@example.com".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = MailpulseConfig::default();
        assert_eq!(config.provider.base_url, "https://api.emailit.com/v1");
        assert_eq!(config.provider.requests_per_minute, 60);
        assert_eq!(config.provider.max_rate_limit_retries, 1);
        assert_eq!(config.templates.template_dir, PathBuf::from("./templates"));
        assert!(config.tracking.database_url.is_none());
    }

    #[test]
    fn test_min_interval() {
        let mut provider = ProviderSettings::default();
        assert_eq!(provider.min_interval(), Duration::from_secs(1));

        provider.requests_per_minute = 120;
        assert_eq!(provider.min_interval(), Duration::from_millis(500));

        provider.requests_per_minute = 0;
        assert_eq!(provider.min_interval(), Duration::ZERO);
    }

    #[test]
    fn test_validate_reports_every_missing_setting() {
        let err = MailpulseConfig::default().validate().unwrap_err();
        let keys: Vec<_> = err.issues().iter().map(|i| i.key).collect();

        assert_eq!(
            keys,
            vec![
                "provider.api_key",
                "sender.default_address",
                "sender.default_name",
                "sender.default_reply_to",
            ]
        );
    }

    #[test]
    fn test_validate_rejects_bad_provider_limits() {
        let mut config = complete();
        config.provider.requests_per_minute = 0;
        config.provider.base_url = "not a url".to_string();

        let err = config.validate().unwrap_err();
        let keys: Vec<_> = err.issues().iter().map(|i| i.key).collect();
        assert!(keys.contains(&"provider.requests_per_minute"));
        assert!(keys.contains(&"provider.base_url"));
    }

    #[test]
    fn test_validate_allows_missing_alert_recipients() {
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = complete();
        let rendered = format!("{:?}", config.provider);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("\"key\""));
    }

    #[test]
    fn test_load_from_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [provider]
                api_key = "from-file"
                requests_per_minute = 30

                [sender]
                default_address = "noreply@example.com"
                alert_recipients = ["ops@example.com"]
                "#,
            )?;
            jail.set_env("MAILPULSE_PROVIDER__API_KEY", "from-env");
            jail.set_env("MAILPULSE_SENDER__DEFAULT_NAME", "Example");

            let config = MailpulseConfig::load_from("custom.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.provider.api_key, "from-env");
            assert_eq!(config.provider.requests_per_minute, 30);
            assert_eq!(config.sender.default_address, "noreply@example.com");
            assert_eq!(config.sender.default_name, "Example");
            assert_eq!(config.sender.alert_recipients, vec!["ops@example.com"]);
            Ok(())
        });
    }

    #[test]
    fn test_alert_recipients_accepts_csv() {
        figment::Jail::expect_with(|jail| {
            jail.set_env(
                "MAILPULSE_SENDER__ALERT_RECIPIENTS",
                "ops@example.com, oncall@example.com",
            );

            let config = MailpulseConfig::load_from("absent.toml").map_err(|e| e.to_string())?;
            assert_eq!(
                config.sender.alert_recipients,
                vec!["ops@example.com", "oncall@example.com"]
            );
            Ok(())
        });
    }
}
