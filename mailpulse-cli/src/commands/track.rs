//! Open tracking CLI commands

use anyhow::Result;
use clap::Subcommand;
use console::{style, Emoji};
use mailpulse::config::MailpulseConfig;
use mailpulse::tracking::{OpenTracker, TrackingRecord};

static SUCCESS: Emoji = Emoji("✓", "√");
static INFO: Emoji = Emoji("ℹ", "i");

/// Tracking record commands
#[derive(Debug, Subcommand)]
pub enum TrackCommand {
    /// Register a tracked email and print its pixel URL
    Create {
        /// Recipient address
        #[arg(short, long)]
        email: String,
    },

    /// Show the open state of a tracked email
    Show {
        /// Tracking ID
        tracking_id: String,
    },
}

impl TrackCommand {
    /// Execute the track command
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `tracking.database_url` is not set
    /// - The database cannot be opened
    /// - The tracking ID is unknown (`show`)
    pub async fn execute(&self, config: &MailpulseConfig) -> Result<()> {
        if config.tracking.database_url.is_none() {
            anyhow::bail!(
                "tracking.database_url must be set; in-memory records would be lost when this command exits"
            );
        }
        let tracker = OpenTracker::from_settings(&config.tracking).await?;

        match self {
            Self::Create { email } => {
                let record = tracker.register(email).await?;
                println!("{} Tracking record created", SUCCESS);
                println!("  {:<12} {}", "ID", style(record.tracking_id).cyan());
                println!("  {:<12} {}", "Pixel URL", tracker.pixel_url(record.tracking_id));
            }
            Self::Show { tracking_id } => {
                let record = tracker.find(tracking_id).await?;
                print_record(&record);
            }
        }

        Ok(())
    }
}

fn print_record(record: &TrackingRecord) {
    println!("\n{} Tracking record {}", INFO, style(record.tracking_id).cyan());
    println!("  {:<12} {}", "Email", record.email);

    match record.opened() {
        Some(event) => {
            println!("  {:<12} {}", "Opened", style("yes").green());
            println!("  {:<12} {}", "At", event.at.to_rfc3339());
            println!(
                "  {:<12} {}",
                "IP",
                event.ip.map_or_else(|| "-".to_string(), |ip| ip.to_string())
            );
            println!(
                "  {:<12} {}",
                "User agent",
                event.user_agent.as_deref().unwrap_or("-")
            );
        }
        None => println!("  {:<12} {}", "Opened", style("no").dim()),
    }
}
