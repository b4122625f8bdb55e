use async_trait::async_trait;
use teloxide::types::{ChatId, Message, Update, UpdateKind};
use teloxide::utils::command::BotCommands;
use url::Url;

use crate::error::{DeliveryFailure, RelayError};
use crate::link::{extract_share_link, ShareLink};
use crate::markdown;
use crate::resolver::{Cascade, ResolvedMedia};

pub static START_TEXT: &str = "Hi! Send me a Terabox share link, and I'll try to get the direct video or download link for you.\n\
Example: https://teraboxapp.com/s/1h97DwtT0zc0uDzfNNWbCsA";

pub static HELP_TEXT: &str = "Send me a Terabox share link. I will process it and provide a downloadable video link or file if available.\n\n\
Important note: some Terabox links (especially for free accounts) might only provide previews or expire quickly. I'll do my best to get the full video, but it's not guaranteed by the external APIs.\n\n\
Example: https://1024terabox.com/s/1lqQc8B3zvkwh5cqByDatog";

pub static NO_LINK_TEXT: &str = "That doesn't look like a valid Terabox share link. Please send a link like:\n\
https://teraboxapp.com/s/some_share_id or https://1024terabox.com/s/some_share_id";

pub static UNRESOLVED_TEXT: &str = "Sorry, I couldn't find a playable video for that Terabox link using any of the available APIs. The link might be invalid, expired, or the content type is not supported.";

pub static DELIVERED_NOTE: &str = "If the video doesn't play directly or download, try clicking the 'Direct Download Link' in the message above or open it in your browser/download manager.\n\n\
Note: full-length streaming via direct links may be limited by Terabox's service policies on free accounts. For complete videos, offline playback or the official Terabox app/website is generally more reliable.";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "explain how to use the bot")]
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    Plain,
    MarkdownV2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReply {
    pub video: Url,
    /// MarkdownV2
    pub caption: String,
    pub thumbnail: Option<Url>,
}

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str, markup: Markup) -> Result<(), RelayError>;

    async fn send_video(&self, chat: ChatId, video: VideoReply) -> Result<(), RelayError>;
}

/// Checks that a message successfully sent; if not, logs why.
fn check_msg(result: Result<(), RelayError>) {
    if let Err(why) = result {
        tracing::error!("{why}");
    }
}

/// Handles inbound chat messages, shared by the webhook and polling paths
pub struct Relay {
    sender: Box<dyn ChatSender>,
    cascade: Cascade,
    bot_name: String,
}

impl Relay {
    pub fn new(sender: Box<dyn ChatSender>, cascade: Cascade, bot_name: String) -> Self {
        Self {
            sender,
            cascade,
            bot_name,
        }
    }

    pub async fn dispatch_update(&self, update: &Update) {
        match &update.kind {
            UpdateKind::Message(message) => self.dispatch(message).await,
            _ => tracing::debug!(update_id = update.id.0, "ignoring non-message update"),
        }
    }

    pub async fn dispatch(&self, message: &Message) {
        let Some(text) = message.text().or_else(|| message.caption()) else {
            return;
        };
        self.handle_text(message.chat.id, text).await;
    }

    pub async fn handle_text(&self, chat: ChatId, text: &str) {
        if text.starts_with('/') {
            match Command::parse(text, &self.bot_name) {
                Ok(command) => self.handle_command(chat, command).await,
                Err(_) => tracing::debug!(chat = chat.0, "ignoring unknown command"),
            }
            return;
        }

        let Some(link) = extract_share_link(text) else {
            check_msg(self.sender.send_text(chat, NO_LINK_TEXT, Markup::Plain).await);
            return;
        };
        self.relay_link(chat, link).await;
    }

    async fn handle_command(&self, chat: ChatId, command: Command) {
        tracing::info!(chat = chat.0, ?command, "command called");
        let text = match command {
            Command::Start => START_TEXT,
            Command::Help => HELP_TEXT,
        };
        check_msg(self.sender.send_text(chat, text, Markup::Plain).await);
    }

    async fn relay_link(&self, chat: ChatId, link: ShareLink) {
        let ack = format!(
            "Received your link: {}\n\n{}",
            markdown::code(link.as_str()),
            markdown::escape("Processing... This might take a moment (up to 30 seconds due to API calls)."),
        );
        check_msg(self.sender.send_text(chat, &ack, Markup::MarkdownV2).await);

        let Some(media) = self.cascade.resolve(&link).await else {
            check_msg(self.sender.send_text(chat, UNRESOLVED_TEXT, Markup::Plain).await);
            return;
        };

        match self.deliver(chat, &media).await {
            Ok(()) => {
                check_msg(self.sender.send_text(chat, DELIVERED_NOTE, Markup::Plain).await);
            }
            Err(e) => {
                tracing::error!(chat = chat.0, "error sending video: {e}");
                self.deliver_fallback(chat, &media, DeliveryFailure::classify(&e))
                    .await;
            }
        }
    }

    async fn deliver(&self, chat: ChatId, media: &ResolvedMedia) -> Result<(), RelayError> {
        let video = checked_url(&media.direct_url)?;
        let thumbnail = media
            .thumbnail_url
            .as_deref()
            .and_then(|t| checked_url(t).ok());
        let caption = markdown::caption(media);
        tracing::debug!(chat = chat.0, "final caption: {caption}");

        self.sender
            .send_video(
                chat,
                VideoReply {
                    video,
                    caption,
                    thumbnail,
                },
            )
            .await
    }

    async fn deliver_fallback(&self, chat: ChatId, media: &ResolvedMedia, reason: DeliveryFailure) {
        let apology = format!(
            "Sorry, I encountered an error while trying to send the video: {}\n\n\
            Please try the direct link below.",
            reason.explanation()
        );
        check_msg(self.sender.send_text(chat, &apology, Markup::Plain).await);

        let fallback = format!(
            "{}\n\n{}\n\n{}",
            markdown::escape("Here's the direct link you can try manually downloading:"),
            markdown::code(&media.direct_url),
            markdown::escape("Remember, some links may have playback restrictions."),
        );
        check_msg(self.sender.send_text(chat, &fallback, Markup::MarkdownV2).await);
    }
}

/// Only absolute http(s) URLs can be handed to Telegram
fn checked_url(url: &str) -> Result<Url, RelayError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(RelayError::InvalidDirectUrl(url.into()));
    }
    Url::parse(url).map_err(|_| RelayError::InvalidDirectUrl(url.into()))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Text(String, Markup),
        Video(VideoReply),
    }

    /// Records everything sent; optionally fails every video send
    #[derive(Clone, Default)]
    pub struct RecordingSender {
        pub sent: Arc<Mutex<Vec<Sent>>>,
        pub video_error: Option<String>,
    }

    impl RecordingSender {
        pub fn failing_videos(error: &str) -> Self {
            Self {
                video_error: Some(error.into()),
                ..Default::default()
            }
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatSender for RecordingSender {
        async fn send_text(&self, _chat: ChatId, text: &str, markup: Markup) -> Result<(), RelayError> {
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Text(text.into(), markup));
            Ok(())
        }

        async fn send_video(&self, _chat: ChatId, video: VideoReply) -> Result<(), RelayError> {
            if let Some(e) = &self.video_error {
                return Err(RelayError::Send(e.clone()));
            }
            self.sent.lock().unwrap().push(Sent::Video(video));
            Ok(())
        }
    }
}
