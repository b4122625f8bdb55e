use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{
    deserialize_size_label, deserialize_text, get_json, present, Provider, ProviderError,
    ResolvedMedia,
};
use crate::link::ShareLink;

/// Cloudflare worker resolver, queried as `?url=<link>`
pub struct WorkerApi {
    client: Client,
    base: Url,
}

impl WorkerApi {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default, deserialize_with = "deserialize_text")]
    status: Option<String>,
    list: Option<Vec<Item>>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(rename = "type", default, deserialize_with = "deserialize_text")]
    kind: Option<String>,
    #[serde(rename = "playUrl", default, deserialize_with = "deserialize_text")]
    play_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size_label")]
    size: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    image: Option<String>,
}

impl Response {
    fn into_media(self) -> Result<ResolvedMedia, ProviderError> {
        if self.status.as_deref() != Some("success") {
            return Err(ProviderError::Rejected("status is not success"));
        }
        self.list
            .unwrap_or_default()
            .into_iter()
            .filter(|item| item.kind.as_deref() == Some("video"))
            .find_map(|item| {
                let url = present(item.play_url)?;
                Some(ResolvedMedia::new(item.name, url, item.size, item.image))
            })
            .ok_or(ProviderError::Rejected("no playable video in list"))
    }
}

#[async_trait]
impl Provider for WorkerApi {
    fn name(&self) -> &'static str {
        "worker"
    }

    async fn fetch(&self, link: &ShareLink) -> Result<ResolvedMedia, ProviderError> {
        let response: Response =
            get_json(&self.client, &self.base, &[("url", link.as_str())]).await?;
        response.into_media()
    }
}
