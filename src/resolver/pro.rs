use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{
    deserialize_size_label, deserialize_text, get_json, present, Provider, ProviderError,
    ResolvedMedia,
};
use crate::link::ShareLink;

static SUCCESS: &str = "\u{2705} Success";

/// Largest first
static THUMBNAIL_SIZES: [&str; 4] = ["850x580", "360x270", "140x90", "60x60"];

/// Vercel-hosted resolver, queried as `?link=<link>`
pub struct ProApi {
    client: Client,
    base: Url,
}

impl ProApi {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default, deserialize_with = "deserialize_text")]
    status: Option<String>,
    #[serde(rename = "\u{1F4CB} Extracted Info")]
    extracted_info: Option<Vec<ExtractedInfo>>,
}

#[derive(Debug, Deserialize)]
struct ExtractedInfo {
    #[serde(
        rename = "\u{1F517} Direct Download Link",
        default,
        deserialize_with = "deserialize_text"
    )]
    direct_download_link: Option<String>,
    #[serde(rename = "\u{1F4C4} Title", default, deserialize_with = "deserialize_text")]
    title: Option<String>,
    #[serde(
        rename = "\u{1F4E6} Size",
        default,
        deserialize_with = "deserialize_size_label"
    )]
    size: Option<String>,
    /// Usually an object of size -> URL, but not always
    #[serde(rename = "\u{1F5BC}\u{FE0F} Thumbnails")]
    thumbnails: Option<Value>,
}

impl ExtractedInfo {
    fn best_thumbnail(&mut self) -> Option<String> {
        let Some(Value::Object(thumbnails)) = self.thumbnails.as_mut() else {
            return None;
        };
        THUMBNAIL_SIZES.iter().find_map(|size| match thumbnails.remove(*size) {
            Some(Value::String(url)) => present(Some(url)),
            _ => None,
        })
    }
}

impl Response {
    fn into_media(self) -> Result<ResolvedMedia, ProviderError> {
        if self.status.as_deref() != Some(SUCCESS) {
            return Err(ProviderError::Rejected("status is not success"));
        }
        let mut info = self
            .extracted_info
            .and_then(|infos| infos.into_iter().next())
            .ok_or(ProviderError::Rejected("empty extracted info"))?;
        let url = present(info.direct_download_link.take())
            .ok_or(ProviderError::Rejected("no direct download link"))?;
        let thumbnail = info.best_thumbnail();
        Ok(ResolvedMedia::new(info.title, url, info.size, thumbnail))
    }
}

#[async_trait]
impl Provider for ProApi {
    fn name(&self) -> &'static str {
        "pro"
    }

    async fn fetch(&self, link: &ShareLink) -> Result<ResolvedMedia, ProviderError> {
        let response: Response =
            get_json(&self.client, &self.base, &[("link", link.as_str())]).await?;
        response.into_media()
    }
}
