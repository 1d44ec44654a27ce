//! Application settings loaded from the environment.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Local,
    Staging,
    Production,
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            _ => Err(ConfigError::Invalid {
                name: "APP_ENV",
                reason: format!("unknown environment '{s}'"),
            }),
        }
    }
}

/// Log level names accepted in `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(ConfigError::Invalid {
                name: "LOG_LEVEL",
                reason: format!("unknown level '{s}'"),
            }),
        }
    }
}

/// PostgreSQL connection settings.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

/// Public endpoint Telegram delivers updates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub base_url: Url,
    pub path: String,
}

impl WebhookConfig {
    /// Joins the base URL and the path into the URL registered with Telegram.
    pub fn url(&self) -> Result<Url, ConfigError> {
        build_webhook_url(self.base_url.as_str(), &self.path)
    }
}

/// All runtime settings.
#[derive(Clone)]
pub struct Settings {
    pub bot_token: String,
    pub bot_username: String,
    pub webhook: Option<WebhookConfig>,
    pub app_env: AppEnv,
    pub log_level: LogLevel,
    pub database: DatabaseConfig,
    pub http_host: String,
    pub http_port: u16,
    pub notify_min_interval: Duration,
    pub token_sweep_interval: Duration,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("bot_username", &self.bot_username)
            .field("webhook", &self.webhook)
            .field("app_env", &self.app_env)
            .field("log_level", &self.log_level)
            .field("database", &self.database)
            .field("http_host", &self.http_host)
            .field("http_port", &self.http_port)
            .finish_non_exhaustive()
    }
}

const DEFAULT_WEBHOOK_PATH: &str = "/bot/webhook";
const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_NOTIFY_MIN_INTERVAL_MS: u64 = 50;
const DEFAULT_TOKEN_SWEEP_INTERVAL_SECS: u64 = 600;

impl Settings {
    /// Loads settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::MissingEnvVar(name));

        let webhook = match var("WEBHOOK_BASE_URL") {
            Some(base) => Some(WebhookConfig {
                base_url: Url::parse(&base).map_err(|e| ConfigError::Invalid {
                    name: "WEBHOOK_BASE_URL",
                    reason: e.to_string(),
                })?,
                path: var("WEBHOOK_PATH").unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_owned()),
            }),
            None => None,
        };

        let app_env = var("APP_ENV").map_or(Ok(AppEnv::default()), |v| v.parse())?;
        let log_level = var("LOG_LEVEL").map_or(Ok(LogLevel::default()), |v| v.parse())?;

        let database = DatabaseConfig {
            host: required("POSTGRES_HOST")?,
            port: parse_or("POSTGRES_PORT", var("POSTGRES_PORT"), DEFAULT_POSTGRES_PORT)?,
            database: required("POSTGRES_DB")?,
            user: required("POSTGRES_USER")?,
            password: required("POSTGRES_PASSWORD")?,
            max_connections: parse_or(
                "POSTGRES_MAX_CONNECTIONS",
                var("POSTGRES_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
        };

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            bot_username: required("BOT_USERNAME")?
                .trim_start_matches('@')
                .to_owned(),
            webhook,
            app_env,
            log_level,
            database,
            http_host: var("HTTP_HOST").unwrap_or_else(|| DEFAULT_HTTP_HOST.to_owned()),
            http_port: parse_or("HTTP_PORT", var("HTTP_PORT"), DEFAULT_HTTP_PORT)?,
            notify_min_interval: Duration::from_millis(parse_or(
                "NOTIFY_MIN_INTERVAL_MS",
                var("NOTIFY_MIN_INTERVAL_MS"),
                DEFAULT_NOTIFY_MIN_INTERVAL_MS,
            )?),
            token_sweep_interval: Duration::from_secs(positive(
                "TOKEN_SWEEP_INTERVAL_SECS",
                parse_or(
                    "TOKEN_SWEEP_INTERVAL_SECS",
                    var("TOKEN_SWEEP_INTERVAL_SECS"),
                    DEFAULT_TOKEN_SWEEP_INTERVAL_SECS,
                )?,
            )?),
        })
    }

    /// Address the webhook listener binds to.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.http_host, self.http_port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "HTTP_HOST",
                reason: e.to_string(),
            })
    }
}

fn parse_or<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("cannot parse '{raw}'"),
        }),
        None => Ok(default),
    }
}

/// Joins a base URL and a path, normalizing the slashes between them.
pub fn build_webhook_url(base: &str, path: &str) -> Result<Url, ConfigError> {
    let path = if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    };
    let joined = format!("{}{path}", base.trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| ConfigError::Invalid {
        name: "WEBHOOK_BASE_URL",
        reason: e.to_string(),
    })
}

/// Rejects zero for settings that drive a timer period.
fn positive(name: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_owned(),
        });
    }
    Ok(value)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
