//! Application configuration, read from the environment (and `.env`).

use anyhow::{Context, anyhow, bail};
use di::{inject, injectable};
use reqwest::Url;
use sqlx::sqlite::SqliteConnectOptions;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const WEBHOOK_PATH: &str = "/webhook";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bot_token: String,
    pub webhook_host: Option<Url>,
    pub webhook_secret: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: SqliteConnectOptions,
    pub session_backend: SessionBackend,
    pub store_timeout: Duration,
    pub queue_idle: Duration,
    pub profile_api_url: Option<Url>,
    pub cors_origins: Vec<String>,
}

#[injectable]
impl AppConfig {
    /// Used by the service container. Startup calls `from_env` first, so a bad
    /// environment never gets this far.
    #[inject]
    pub fn create() -> AppConfig {
        AppConfig::from_env().unwrap_or_else(|e| panic!("invalid configuration: {e:#}"))
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<AppConfig> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<AppConfig> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = var("BOT_TOKEN").ok_or_else(|| anyhow!("BOT_TOKEN must be set"))?;

        let webhook_host = var("WEBHOOK_HOST")
            .map(|v| Url::parse(&v).context("WEBHOOK_HOST is not a valid URL"))
            .transpose()?;

        let profile_api_url = var("PROFILE_API_URL")
            .map(|v| Url::parse(&v).context("PROFILE_API_URL is not a valid URL"))
            .transpose()?;

        let port = var("WEBAPP_PORT")
            .map(|v| v.parse::<u16>().context("WEBAPP_PORT must be a port number"))
            .transpose()?
            .unwrap_or(8000);

        let database = SqliteConnectOptions::from_str(
            var("DATABASE_URL").as_deref().unwrap_or("sqlite:bot.db?mode=rwc"),
        )
        .context("DATABASE_URL is not a valid SQLite URL")?;

        let session_backend = match var("SESSION_BACKEND").as_deref() {
            None | Some("sqlite") => SessionBackend::Sqlite,
            Some("memory") => SessionBackend::Memory,
            Some(other) => bail!("SESSION_BACKEND must be `sqlite` or `memory`, got `{other}`"),
        };

        let store_timeout = var("STORE_TIMEOUT_MS")
            .map(|v| v.parse::<u64>().context("STORE_TIMEOUT_MS must be a number"))
            .transpose()?
            .unwrap_or(2_000);

        let queue_idle = var("QUEUE_IDLE_SECS")
            .map(|v| v.parse::<u64>().context("QUEUE_IDLE_SECS must be a number"))
            .transpose()?
            .unwrap_or(60);

        let cors_origins = var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(AppConfig {
            bot_token,
            webhook_host,
            webhook_secret: var("WEBHOOK_SECRET"),
            host: var("WEBAPP_HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
            database,
            session_backend,
            store_timeout: Duration::from_millis(store_timeout),
            queue_idle: Duration::from_secs(queue_idle),
            profile_api_url,
            cors_origins,
        })
    }

    /// Full URL the platform should deliver updates to.
    pub fn webhook_url(&self) -> Option<Url> {
        self.webhook_host
            .as_ref()
            .and_then(|host| host.join(WEBHOOK_PATH).ok())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
