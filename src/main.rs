mod config;
mod error;
mod link;
mod markdown;
mod message;
mod resolver;
mod telegram;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::Message;
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, CONFIG_FILE};
use crate::message::Relay;
use crate::resolver::Cascade;
use crate::telegram::TelegramSender;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "terabox_relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::get_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Error reading {}: {}", CONFIG_FILE, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let bot = telegram::build_bot(&config)?;

    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_secs(config.provider_timeout_secs))
        .build()?;
    let cascade = Cascade::from_config(&config, client)?;
    tracing::info!(order = ?cascade.provider_names(), "resolver cascade ready");

    let sender = TelegramSender::new(
        bot.clone(),
        Duration::from_secs(config.delivery_timeout_secs),
    );
    let bot_name = telegram::bot_username(&bot).await;
    let relay = Arc::new(Relay::new(Box::new(sender), cascade, bot_name));

    match config.webhook_endpoint() {
        Some(endpoint) => serve_webhook(&config, bot, relay, &endpoint).await,
        None => {
            tracing::warn!("WEBHOOK_URL not set, falling back to long-polling");
            poll(bot, relay).await;
            Ok(())
        }
    }
}

async fn serve_webhook(config: &Config, bot: Bot, relay: Arc<Relay>, endpoint: &str) -> Result<()> {
    // Registration finishes before we accept traffic
    telegram::register_webhook(
        &bot,
        endpoint,
        config.webhook_secret.as_deref(),
        telegram::Retry::default(),
    )
    .await;

    let app = webhook::router(relay, config.webhook_secret.clone());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn poll(bot: Bot, relay: Arc<Relay>) {
    teloxide::repl(bot, move |message: Message| {
        let relay = relay.clone();
        async move {
            relay.dispatch(&message).await;
            respond(())
        }
    })
    .await;
}

async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        _ => {
            tracing::error!("Error creating signal handlers");
            return std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, exiting"),
        _ = sigint.recv() => tracing::info!("Received SIGINT, exiting"),
    }
}
