//! Configuration check command

use anyhow::Result;
use console::{style, Emoji};
use mailpulse::config::MailpulseConfig;

use super::require_valid;

static SUCCESS: Emoji = Emoji("✓", "√");
static WARN: Emoji = Emoji("⚠", "!");

/// Validate the configuration and print a summary
pub struct CheckConfigCommand;

impl CheckConfigCommand {
    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if any required setting is missing or invalid
    pub fn execute(config: &MailpulseConfig) -> Result<()> {
        require_valid(config)?;

        println!("{} {}", SUCCESS, style("Configuration is valid").green().bold());
        println!();
        println!("  {:<22} {}", "Provider", config.provider.base_url);
        println!(
            "  {:<22} {} requests/minute",
            "Rate limit", config.provider.requests_per_minute
        );
        println!(
            "  {:<22} {}",
            "Default sender",
            mailpulse::email::format_sender(
                &config.sender.default_address,
                Some(&config.sender.default_name)
            )
        );
        println!(
            "  {:<22} {}",
            "Templates",
            config.templates.template_dir.display()
        );
        println!(
            "  {:<22} {}",
            "Tracking store",
            config
                .tracking
                .database_url
                .as_deref()
                .unwrap_or("in-memory")
        );

        if config.sender.alert_recipients.is_empty() {
            println!();
            println!(
                "{} {} is empty; alerts will go to {}",
                WARN,
                style("sender.alert_recipients").yellow(),
                config.sender.default_address
            );
        }

        Ok(())
    }
}
