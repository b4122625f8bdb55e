use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode};
use url::Url;

use crate::config::Config;
use crate::error::RelayError;
use crate::message::{ChatSender, Markup, VideoReply};

/// Backoff schedule for webhook registration
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
        }
    }
}

/// Build the bot handle; its HTTP client waits long enough for large media uploads
pub fn build_bot(config: &Config) -> anyhow::Result<Bot> {
    if config.bot_token.trim().is_empty() {
        return Err(RelayError::ConfigToken.into());
    }
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(config.delivery_timeout_secs))
        .build()?;
    Ok(Bot::with_client(config.bot_token.trim(), client))
}

/// Username used to match `/command@botname`; empty if it can't be fetched
pub async fn bot_username(bot: &Bot) -> String {
    match bot.get_me().await {
        Ok(me) => me.username().to_owned(),
        Err(e) => {
            tracing::warn!("could not fetch bot identity: {e}");
            String::new()
        }
    }
}

/// Point Telegram at our webhook, retrying with backoff.
///
/// Returns whether registration succeeded. Failure is not fatal; the server keeps serving.
pub async fn register_webhook(
    bot: &Bot,
    endpoint: &str,
    secret: Option<&str>,
    retry: Retry,
) -> bool {
    let url = match Url::parse(endpoint) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(endpoint, "invalid webhook URL: {e}");
            return false;
        }
    };

    let mut delay = retry.initial_delay;
    for attempt in 1..=retry.attempts {
        tracing::info!(attempt, "setting webhook to {url}");
        let mut request = bot.set_webhook(url.clone());
        if let Some(secret) = secret {
            request = request.secret_token(secret.to_owned());
        }
        match request.await {
            Ok(_) => {
                tracing::info!("webhook registered");
                return true;
            }
            Err(e) if attempt < retry.attempts => {
                tracing::warn!(attempt, "failed to set webhook: {e}, retrying in {delay:?}");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(retry.max_delay);
            }
            Err(e) => {
                tracing::error!("giving up on webhook registration: {e}");
            }
        }
    }
    false
}

pub struct TelegramSender {
    bot: Bot,
    delivery_timeout: Duration,
}

impl TelegramSender {
    pub fn new(bot: Bot, delivery_timeout: Duration) -> Self {
        Self {
            bot,
            delivery_timeout,
        }
    }
}

#[async_trait]
impl ChatSender for TelegramSender {
    async fn send_text(&self, chat: ChatId, text: &str, markup: Markup) -> Result<(), RelayError> {
        let mut request = self.bot.send_message(chat, text);
        if markup == Markup::MarkdownV2 {
            request = request.parse_mode(ParseMode::MarkdownV2);
        }
        request
            .await
            .map(|_| ())
            .map_err(|e| RelayError::Send(e.to_string()))
    }

    async fn send_video(&self, chat: ChatId, video: VideoReply) -> Result<(), RelayError> {
        let mut request = self
            .bot
            .send_video(chat, InputFile::url(video.video))
            .caption(video.caption)
            .parse_mode(ParseMode::MarkdownV2)
            .supports_streaming(true);
        if let Some(thumbnail) = video.thumbnail {
            request = request.thumbnail(InputFile::url(thumbnail));
        }

        match tokio::time::timeout(self.delivery_timeout, request.send()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RelayError::Send(e.to_string())),
            Err(_) => Err(RelayError::Timeout),
        }
    }
}
