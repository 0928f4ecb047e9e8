//! Send and alert commands

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use console::{style, Emoji};
use mailpulse::config::MailpulseConfig;
use mailpulse::email::{DeliveryService, OutgoingEmail};
use serde_json::Value;

use super::require_valid;

static SUCCESS: Emoji = Emoji("✓", "√");

/// Send an email
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("body").required(true).args(["html", "template"])))]
pub struct SendCommand {
    /// Recipient address, or several separated by commas
    #[arg(long)]
    pub to: String,

    /// Subject line
    #[arg(short, long)]
    pub subject: Option<String>,

    /// Raw HTML body
    #[arg(long)]
    pub html: Option<String>,

    /// Named template to render
    #[arg(short, long)]
    pub template: Option<String>,

    /// Template context as a JSON object
    #[arg(long, requires = "template")]
    pub context: Option<String>,

    /// Sender address (defaults to sender.default_address)
    #[arg(long)]
    pub from: Option<String>,

    /// Sender display name (defaults to sender.default_name)
    #[arg(long)]
    pub from_name: Option<String>,

    /// Reply-To address
    #[arg(long)]
    pub reply_to: Option<String>,

    /// CC address
    #[arg(long)]
    pub cc: Option<String>,
}

impl SendCommand {
    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - `--context` is not a JSON object
    /// - Rendering or delivery fails
    pub async fn execute(self, config: &MailpulseConfig) -> Result<()> {
        require_valid(config)?;
        let delivery = DeliveryService::from_config(config)?;

        let context = parse_context(self.context.as_deref())?;
        let email = OutgoingEmail {
            to: self.to,
            from: self.from,
            from_name: self.from_name,
            reply_to: self.reply_to,
            cc: self.cc,
            subject: self.subject,
            html: self.html.unwrap_or_default(),
            ..OutgoingEmail::default()
        };
        let recipient = email.to.clone();

        let response = match self.template.as_deref() {
            Some(template) => delivery.render_and_send(email, template, &context).await?,
            None => delivery.send(email).await?,
        };

        println!("{} Email sent to {}", SUCCESS, style(recipient).cyan());
        print_response(response.as_ref())?;
        Ok(())
    }
}

/// Send a system alert
#[derive(Debug, Args)]
pub struct AlertCommand {
    /// Alert subject, sent as `Alert: <subject>`
    #[arg(short, long)]
    pub subject: String,

    /// Alert message
    #[arg(short, long)]
    pub message: String,
}

impl AlertCommand {
    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or delivery fails
    pub async fn execute(self, config: &MailpulseConfig) -> Result<()> {
        require_valid(config)?;
        let delivery = DeliveryService::from_config(config)?;

        let response = delivery
            .send_system_alert(&self.subject, &self.message)
            .await?;

        println!("{} Alert sent", SUCCESS);
        print_response(response.as_ref())?;
        Ok(())
    }
}

fn parse_context(raw: Option<&str>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(Value::Object(serde_json::Map::new()));
    };

    let value: Value = serde_json::from_str(raw).context("--context must be valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("--context must be a JSON object");
    }
    Ok(value)
}

fn print_response(response: Option<&Value>) -> Result<()> {
    if let Some(response) = response {
        println!("{}", style("Provider response:").dim());
        println!("{}", serde_json::to_string_pretty(response)?);
    }
    Ok(())
}
