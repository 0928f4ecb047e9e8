//! HTTP server command

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use mailpulse::config::MailpulseConfig;
use mailpulse::handlers;
use mailpulse::state::AppState;
use std::net::SocketAddr;
use tracing::info;

use super::require_valid;

/// Run the HTTP adapter
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind (overrides server.bind_address)
    #[arg(short, long)]
    pub bind: Option<String>,
}

impl ServeCommand {
    /// Execute the command
    ///
    /// Serves until Ctrl-C, then drains in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The tracking database cannot be opened
    /// - The address cannot be bound
    pub async fn execute(self, mut config: MailpulseConfig) -> Result<()> {
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        require_valid(&config)?;

        let state = AppState::from_config(&config).await?;
        let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
            .await
            .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
        let addr = listener.local_addr()?;

        println!(
            "{} {}",
            style("Listening on").green().bold(),
            style(format!("http://{addr}")).cyan()
        );
        info!(%addr, "mailpulse server started");

        axum::serve(
            listener,
            handlers::router(state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

        info!("mailpulse server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
