//! CLI command implementations

pub mod check;
pub mod send;
pub mod serve;
pub mod track;

pub use check::CheckConfigCommand;
pub use send::{AlertCommand, SendCommand};
pub use serve::ServeCommand;
pub use track::TrackCommand;

use anyhow::{Context, Result};
use console::style;
use mailpulse::config::{ConfigError, MailpulseConfig};
use std::path::Path;

/// Load configuration from `path`, or from `./mailpulse.toml` and the environment
///
/// # Errors
///
/// Returns an error if a configuration source cannot be parsed
pub fn load_config(path: Option<&Path>) -> Result<MailpulseConfig> {
    match path {
        Some(path) => MailpulseConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => MailpulseConfig::load().context("Failed to load configuration"),
    }
}

/// Validate `config`, printing every problem before failing
///
/// # Errors
///
/// Returns an error if any required setting is missing or invalid
pub fn require_valid(config: &MailpulseConfig) -> Result<()> {
    if let Err(error) = config.validate() {
        print_issues(&error);
        anyhow::bail!("{} configuration problem(s) found", error.issues().len());
    }
    Ok(())
}

fn print_issues(error: &ConfigError) {
    eprintln!("{}", style("Configuration is invalid:").red().bold());
    for issue in error.issues() {
        eprintln!("  {} {}", style(issue.key).yellow(), issue.message);
    }
    if error.issues().is_empty() {
        eprintln!("  {error}");
    }
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "[provider]\napi_key = \"from-file\"\n\n[server]\nbind_address = \"0.0.0.0:8080\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.provider.api_key, "from-file");
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_require_valid_reports_missing_settings() {
        let err = require_valid(&MailpulseConfig::default()).unwrap_err();
        assert!(err.to_string().contains("configuration problem"));
    }
}
