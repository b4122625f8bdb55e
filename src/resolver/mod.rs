mod pro;
mod thory;
mod worker;

use std::fmt::Display;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

pub use self::pro::ProApi;
pub use self::thory::ThoryApi;
pub use self::worker::WorkerApi;
use crate::config::Config;
use crate::link::ShareLink;

/// Some resolvers answer 200 with this text in place of a download link
pub const OUTAGE_MARKER: &str = "download feature is currently down";

static DEFAULT_TITLE: &str = "Video";

/// A direct link produced by a resolver, ready to be relayed back to the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub title: String,
    pub direct_url: String,
    pub size_label: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl ResolvedMedia {
    fn new(
        title: Option<String>,
        direct_url: String,
        size_label: Option<String>,
        thumbnail_url: Option<String>,
    ) -> Self {
        Self {
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.into()),
            direct_url,
            size_label,
            thumbnail_url: thumbnail_url.filter(|t| !t.is_empty()),
        }
    }

    fn is_outage(&self) -> bool {
        self.direct_url.to_lowercase().contains(OUTAGE_MARKER)
    }
}

#[derive(Debug)]
pub enum ProviderError {
    Transport(reqwest::Error),
    Status(StatusCode),
    Decode(reqwest::Error),
    Rejected(&'static str),
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) if e.is_timeout() => write!(f, "request timed out: {e}"),
            Self::Transport(e) => write!(f, "request error: {e}"),
            Self::Status(status) => write!(f, "unexpected status {status}"),
            Self::Decode(e) => write!(f, "JSON decode error: {e}"),
            Self::Rejected(reason) => write!(f, "no usable result: {reason}"),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Worker,
    Thory,
    Pro,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, link: &ShareLink) -> Result<ResolvedMedia, ProviderError>;

    /// Like `fetch`, but failures are logged and swallowed
    async fn resolve(&self, link: &ShareLink) -> Option<ResolvedMedia> {
        match self.fetch(link).await {
            Ok(media) => Some(media),
            Err(e) => {
                tracing::warn!(provider = self.name(), "{e}");
                None
            }
        }
    }
}

/// Tries each provider in order until one returns a usable link
pub struct Cascade {
    providers: Vec<Box<dyn Provider>>,
}

impl Cascade {
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(config: &Config, client: Client) -> anyhow::Result<Self> {
        let mut providers: Vec<Box<dyn Provider>> = Vec::new();
        for kind in &config.provider_order {
            let provider: Box<dyn Provider> = match kind {
                ProviderKind::Worker => {
                    Box::new(WorkerApi::new(client.clone(), Url::parse(&config.worker_base)?))
                }
                ProviderKind::Thory => {
                    Box::new(ThoryApi::new(client.clone(), Url::parse(&config.thory_base)?))
                }
                ProviderKind::Pro => {
                    Box::new(ProApi::new(client.clone(), Url::parse(&config.pro_base)?))
                }
            };
            providers.push(provider);
        }
        Ok(Self::new(providers))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn resolve(&self, link: &ShareLink) -> Option<ResolvedMedia> {
        for provider in &self.providers {
            tracing::info!(provider = provider.name(), %link, "trying resolver");
            match provider.resolve(link).await {
                Some(media) if media.is_outage() => {
                    tracing::warn!(provider = provider.name(), "resolver reports downloads are down");
                }
                Some(media) => {
                    tracing::info!(provider = provider.name(), "resolved {}", media.title);
                    return Some(media);
                }
                None => {
                    tracing::warn!(provider = provider.name(), "resolver returned nothing useful");
                }
            }
        }
        None
    }
}

/// GET `base` with `query` appended and decode the JSON body
async fn get_json<T>(client: &Client, base: &Url, query: &[(&str, &str)]) -> Result<T, ProviderError>
where
    T: DeserializeOwned,
{
    let response = client
        .get(base.clone())
        .query(query)
        .send()
        .await
        .map_err(ProviderError::Transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status));
    }

    response.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            ProviderError::Decode(e)
        } else {
            ProviderError::Transport(e)
        }
    })
}

/// Sizes come back either as a byte count or as pre-formatted text.
/// Anything else (negative, objects, ...) is dropped rather than failing the response.
fn deserialize_size_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|bytes| bytes.is_finite() && *bytes >= 0.0)
            .map(human_size),
        Some(Value::String(text)) => present(Some(text)),
        _ => None,
    })
}

/// Optional display text; a value of the wrong type counts as absent
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

fn human_size(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", value as u64, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Non-empty string or nothing
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
