//! Webhook-driven Telegram registration bot
//!
//! (c) Softlandia 2025

use tokio_recruit_bot::api;
use tokio_recruit_bot::config::{AppConfig, SessionBackend};
use tokio_recruit_bot::core::dispatcher::UserQueues;
use tokio_recruit_bot::core::executor::SideEffectExecutor;
use tokio_recruit_bot::core::services::SessionConversationEngine;
use tokio_recruit_bot::infrastructure::database::DatabaseConnection;
use tokio_recruit_bot::infrastructure::memory::InMemorySessionStore;
use tokio_recruit_bot::infrastructure::profile_api::HttpProfileApi;
use tokio_recruit_bot::infrastructure::repositories::{DbProfileRepository, DbSessionStore};
use tokio_recruit_bot::infrastructure::telegram::{self, TelegramSender};

use anyhow::{Context, anyhow};
use axum::http::{HeaderValue, Method};
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use log::{info, warn};
use teloxide::Bot;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// How long accepted updates may take to finish once the server stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(web_server_task(config))
}

async fn web_server_task(config: AppConfig) -> anyhow::Result<()> {
    let mut services = ServiceCollection::new();
    services
        .add(AppConfig::singleton())
        .add(DatabaseConnection::singleton())
        .add(DbProfileRepository::singleton())
        .add(TelegramSender::singleton())
        .add(HttpProfileApi::singleton())
        .add(SideEffectExecutor::singleton())
        .add(SessionConversationEngine::singleton())
        .add(UserQueues::singleton());

    match config.session_backend {
        SessionBackend::Sqlite => services.add(DbSessionStore::singleton()),
        SessionBackend::Memory => services.add(InMemorySessionStore::singleton()),
    };

    let provider = services
        .build_provider()
        .map_err(|e| anyhow!("invalid service registrations: {e}"))?;

    provider
        .get_required::<DatabaseConnection>()
        .migrate()
        .await
        .context("failed to run database migrations")?;

    let bot = Bot::new(&config.bot_token);
    if let Some(url) = config.webhook_url() {
        telegram::register_webhook(&bot, url, config.webhook_secret.as_deref()).await?;
    } else {
        warn!("WEBHOOK_HOST is not set, expecting updates to be delivered by a proxy");
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!("ignoring invalid CORS origin {origin}");
                None
            }
        })
        .collect();

    let queues = provider.get_required::<UserQueues>();

    let app = api::router()
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_headers(Any)
                    .allow_methods([Method::GET, Method::POST])
                    .allow_origin(origins),
            ),
        )
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("cannot bind {}", config.bind_address()))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    queues.shutdown(SHUTDOWN_GRACE).await;
    if config.webhook_url().is_some() {
        telegram::delete_webhook(&bot).await?;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}
