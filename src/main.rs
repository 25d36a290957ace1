use std::sync::Arc;

use futures::StreamExt;

use bakebot::catalog::Catalog;
use bakebot::channels::{Channel, CliChannel, TelegramChannel};
use bakebot::config::{BotConfig, ChannelKind};
use bakebot::dialogue::DialogueEngine;
use bakebot::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("🎂 bakebot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());

    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: Failed to open database at {}: {e}",
                    config.db_path.display()
                );
                std::process::exit(1);
            }),
    );

    // The catalog is managed out-of-band; seed the demo one on request.
    let catalog = Catalog::new(Arc::clone(&db));
    if std::env::var("BAKEBOT_SEED_DEMO").is_ok() {
        catalog.seed_demo().await?;
    }
    if catalog.is_empty().await? {
        tracing::warn!(
            "The catalog has no categories; customers cannot build cakes. \
             Set BAKEBOT_SEED_DEMO=1 to load the demo catalog."
        );
    }

    let engine = Arc::new(DialogueEngine::new(
        Arc::clone(&db),
        config.policy_document.clone(),
    ));

    let channel: Arc<dyn Channel> = match config.channel {
        ChannelKind::Telegram => {
            let token = config
                .bot_token
                .clone()
                .expect("telegram channel requires a bot token");
            let telegram = TelegramChannel::new(token);
            telegram.health_check().await?;
            Arc::new(telegram)
        }
        ChannelKind::Cli => Arc::new(CliChannel::new()),
    };

    tracing::info!(channel = channel.name(), "Starting bakebot");
    let mut stream = channel.start().await?;

    while let Some(msg) = stream.next().await {
        let engine = Arc::clone(&engine);
        let channel = Arc::clone(&channel);

        // One task per inbound message; the engine's per-session lock keeps
        // a single customer's events serialized while different customers
        // proceed in parallel.
        tokio::spawn(async move {
            let (_, replies) = if msg.is_start() {
                engine
                    .handle_start(
                        &msg.sender,
                        msg.sender_name.as_deref().unwrap_or("there"),
                        msg.sender_last_name.as_deref(),
                    )
                    .await
            } else {
                engine.handle_event(&msg.sender, &msg.content).await
            };

            for reply in &replies {
                if let Err(e) = channel.respond(&msg, reply).await {
                    tracing::error!(sender = %msg.sender, error = %e, "Failed to deliver reply");
                    break;
                }
            }
        });
    }

    channel.shutdown().await?;
    Ok(())
}
