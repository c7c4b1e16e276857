use chrono::Utc;
use clap::Parser;
use modrelay::adapters::{TelegramTransport, Update};
use modrelay::cli::{Cli, Commands};
use modrelay::config::AppConfig;
use modrelay::domain::{Origin, Submitter};
use modrelay::error::{RelayError, Result};
use modrelay::persistence::SnapshotStore;
use modrelay::services::{ArchiveSink, RelayEngine, RequestRegistry};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;
    init_logging(&config.logging.level);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("config: {}", e);
        }
        return Err(RelayError::InvalidConfig(errors.join("; ")));
    }

    match &cli.command {
        Some(Commands::Export { output }) => run_export(&config, output),
        Some(Commands::Run) | None => run_bot(config).await,
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_export(config: &AppConfig, output: &Path) -> Result<()> {
    let sink = ArchiveSink::new(&config.storage.archive_dir);
    let bundle = sink.export_bundle()?;
    std::fs::write(output, &bundle)?;
    info!(path = %output.display(), bytes = bundle.len(), "archive bundle written");
    Ok(())
}

async fn run_bot(config: AppConfig) -> Result<()> {
    let transport = Arc::new(TelegramTransport::new(&config.telegram.bot_token));
    let store = SnapshotStore::new(&config.storage.state_dir)?;
    let registry = RequestRegistry::load(
        store,
        config.storage.resolution_retention_secs,
        Utc::now(),
    );
    info!(
        pending = registry.pending_count(),
        reviewers = config.fanout_targets().len(),
        "relay starting"
    );

    let engine = Arc::new(RelayEngine::new(&config, transport.clone(), registry));

    let poller = {
        let engine = engine.clone();
        let transport = transport.clone();
        let poll_timeout = config.telegram.poll_timeout_secs;
        tokio::spawn(async move {
            let mut offset = 0i64;
            loop {
                match transport.get_updates(offset, poll_timeout).await {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            route_update(&engine, update).await;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "update poll failed, backing off");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        })
    };

    signal::ctrl_c().await?;
    info!("shutdown signal received");
    poller.abort();
    engine.persist().await;
    info!(pending = engine.pending_count().await, "final snapshot written");
    Ok(())
}

/// Map one transport update onto an engine entry point. Only private chats
/// feed submissions; everything else is dropped here.
async fn route_update(engine: &RelayEngine, update: Update) {
    if let Some(cb) = update.callback_query {
        let Some(data) = cb.data else {
            return;
        };
        let panel_message_id = cb.message.as_ref().map(|m| m.message_id).unwrap_or(0);
        engine
            .handle_review_action(cb.from.id, &cb.id, panel_message_id, &data)
            .await;
        return;
    }

    if let Some(msg) = update.message {
        if !msg.is_private() {
            return;
        }
        let Some(from) = msg.from.clone() else {
            return;
        };
        if let Some(text) = &msg.text {
            if engine.handle_admin_command(from.id, text).await {
                return;
            }
        }

        let origin = Origin {
            chat_id: msg.chat.id,
            message_id: msg.message_id,
        };
        let submitter = Submitter {
            id: from.id,
            username: from.username,
        };
        engine.handle_submission(origin, submitter, msg.content()).await;
    }
}
