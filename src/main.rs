mod config;
mod event;
mod router;
mod session;
mod signal;
mod webhook;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::session::BotSession;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bridgebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration, failing fast before any session is built
    let config = Config::from_env()?;

    info!("Configuration loaded successfully");
    info!("  Sessions: {}", config.sessions.len());
    info!("  Webhook timeout: {:?}", config.webhook_timeout);

    let mut running = Vec::new();
    for session_config in config.sessions {
        let session = BotSession::new(
            session_config,
            config.webhook_timeout,
            config.honor_command_reply,
        )?;
        running.push(session.spawn());
    }

    info!("All bots are running. Press Ctrl+C to stop.");
    signal::shutdown_signal().await;

    info!("Stopping bots...");
    for session in &running {
        session.stop().await;
    }
    for session in running {
        session.join().await;
    }

    info!("All bots stopped.");
    Ok(())
}
