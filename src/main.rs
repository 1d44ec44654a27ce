//! Valentot Bot - Main Entry Point
//!
//! A Telegram bot that delivers anonymous valentines through personal links.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use teloxide::Bot;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use valentot_bot::bot::BotHandler;
use valentot_bot::config::{AppEnv, LogLevel, Settings};
use valentot_bot::maintenance::{SweeperMessage, TokenSweeper};
use valentot_bot::storage::{self, PgStore};
use valentot_bot::telegram::{TelegramTransport, UpdateSource};

/// Telegram bot for anonymous valentines.
#[derive(Parser, Debug)]
#[command(name = "valentot_bot")]
#[command(about = "Receive anonymous valentines through personal links")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (debug, info, warning, error, critical). Overrides LOG_LEVEL.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Receive updates by long polling instead of the webhook.
    #[arg(long)]
    polling: bool,

    /// Apply database migrations and exit.
    #[arg(long)]
    migrate_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables before reading settings
    let env_loaded = dotenvy::from_filename(&args.env_file);

    let settings = Settings::from_env().context("Failed to load settings from environment")?;

    let level = match args.log_level.as_deref() {
        Some(raw) => raw.parse::<LogLevel>().context("Invalid --log-level")?,
        None => settings.log_level,
    };
    init_logging(level);

    if let Err(e) = env_loaded {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }
    info!("Starting valentot bot ({:?} environment)", settings.app_env);

    // Database
    let pool = storage::connect(&settings.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    storage::migrate(&pool)
        .await
        .context("Failed to apply database migrations")?;

    if args.migrate_only {
        info!("Migrations applied, exiting");
        pool.close().await;
        return Ok(());
    }

    let source = update_source(args.polling, &settings)?;
    let store = Arc::new(PgStore::new(pool));

    // Token sweeper
    let (sweeper_tx, sweeper_rx) = mpsc::channel::<SweeperMessage>(8);
    let sweeper = TokenSweeper::new(Arc::clone(&store), settings.token_sweep_interval);
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run(sweeper_rx).await;
    });

    // Telegram
    let bot = Bot::new(settings.bot_token.clone());
    let handler = BotHandler::new(Arc::clone(&store), settings.bot_username.clone());
    let transport = Arc::new(TelegramTransport::new(
        bot,
        handler,
        settings.notify_min_interval,
    ));

    info!(
        "Bot @{} is running. Use Ctrl+C to stop.",
        settings.bot_username
    );
    let result = transport.run(source).await;

    // Cleanup
    info!("Shutting down...");
    let _ = sweeper_tx.send(SweeperMessage::Shutdown).await;
    if let Err(e) = sweeper_handle.await {
        error!("Token sweeper task failed: {}", e);
    }
    store.pool().close().await;

    result.context("Telegram dispatcher failed")
}

/// Initializes the logging subsystem. `RUST_LOG` wins over `level`.
fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Picks how updates are received.
///
/// Long polling is used when forced on the command line or when a local
/// deployment has no webhook; other environments require a webhook.
fn update_source(force_polling: bool, settings: &Settings) -> Result<UpdateSource> {
    if force_polling {
        return Ok(UpdateSource::Polling);
    }
    match &settings.webhook {
        Some(webhook) => Ok(UpdateSource::Webhook {
            listen: settings.listen_addr()?,
            url: webhook.url()?,
        }),
        None if settings.app_env == AppEnv::Local => Ok(UpdateSource::Polling),
        None => bail!(
            "WEBHOOK_BASE_URL is required in the {:?} environment (or pass --polling)",
            settings.app_env
        ),
    }
}
