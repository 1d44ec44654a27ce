//! Configuration module for the bot.
//!
//! Settings come from environment variables, optionally preloaded from a
//! `.env` file by the binary.

mod settings;

pub use settings::{
    AppEnv, ConfigError, DatabaseConfig, LogLevel, Settings, WebhookConfig, build_webhook_url,
};
