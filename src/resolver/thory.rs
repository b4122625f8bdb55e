use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{
    deserialize_size_label, deserialize_text, get_json, present, Provider, ProviderError,
    ResolvedMedia,
};
use crate::link::ShareLink;

/// Free-tier resolver, queried as `?key=free&url=<link>`
pub struct ThoryApi {
    client: Client,
    base: Url,
}

impl ThoryApi {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default, deserialize_with = "deserialize_text")]
    status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    download_link: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    file_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size_label")]
    file_size: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    thumbnail: Option<String>,
}

impl Response {
    fn into_media(self) -> Result<ResolvedMedia, ProviderError> {
        if self.status.as_deref() != Some("success") {
            return Err(ProviderError::Rejected("status is not success"));
        }
        let url = present(self.download_link).ok_or(ProviderError::Rejected("no download_link"))?;
        Ok(ResolvedMedia::new(
            self.file_name,
            url,
            self.file_size,
            self.thumbnail,
        ))
    }
}

#[async_trait]
impl Provider for ThoryApi {
    fn name(&self) -> &'static str {
        "thory"
    }

    async fn fetch(&self, link: &ShareLink) -> Result<ResolvedMedia, ProviderError> {
        let response: Response = get_json(
            &self.client,
            &self.base,
            &[("key", "free"), ("url", link.as_str())],
        )
        .await?;
        response.into_media()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::link::extract_share_link;
    use crate::resolver::test_server;

    fn parse(value: serde_json::Value) -> Result<ResolvedMedia, ProviderError> {
        serde_json::from_value::<Response>(value).unwrap().into_media()
    }

    #[test]
    fn maps_top_level_fields() {
        let media = parse(json!({
            "status": "success",
            "download_link": "https://d.example/file?sign=x",
            "file_name": "holiday.mkv",
            "file_size": 1073741824u64,
            "thumbnail": "https://d.example/t.jpg"
        }))
        .unwrap();

        assert_eq!(media.title, "holiday.mkv");
        assert_eq!(media.direct_url, "https://d.example/file?sign=x");
        assert_eq!(media.size_label.as_deref(), Some("1.00 GB"));
        assert_eq!(media.thumbnail_url.as_deref(), Some("https://d.example/t.jpg"));
    }

    #[test]
    fn missing_optional_fields() {
        let media = parse(json!({
            "status": "success",
            "download_link": "https://d.example/file"
        }))
        .unwrap();
        assert_eq!(media.title, "Video");
        assert_eq!(media.size_label, None);
        assert_eq!(media.thumbnail_url, None);
    }

    #[test]
    fn rejects_without_link_or_success() {
        assert!(parse(json!({"status": "success", "download_link": ""})).is_err());
        assert!(parse(json!({"status": "success"})).is_err());
        assert!(parse(json!({"status": "failed", "download_link": "https://d.example/f"})).is_err());
        assert!(parse(json!({"status": "success", "download_link": ["https://d.example/f"]})).is_err());
    }

    #[test]
    fn odd_optional_fields_do_not_lose_the_link() {
        let media = parse(json!({
            "status": "success",
            "download_link": "https://d.example/file",
            "file_name": {"name": "x"},
            "file_size": "",
            "thumbnail": false
        }))
        .unwrap();
        assert_eq!(media.title, "Video");
        assert_eq!(media.direct_url, "https://d.example/file");
        assert_eq!(media.size_label, None);
        assert_eq!(media.thumbnail_url, None);
    }

    #[tokio::test]
    async fn queries_with_free_key() {
        let router = Router::new().route(
            "/api",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                Json(json!({
                    "status": "success",
                    "download_link": format!(
                        "https://d.example/{}/{}",
                        query.get("key").cloned().unwrap_or_default(),
                        query.get("url").cloned().unwrap_or_default().len()
                    ),
                }))
            }),
        );
        let base = test_server::serve(router).await;
        let api = ThoryApi::new(Client::new(), base);
        let link = extract_share_link("https://terabox.com/s/abc").unwrap();

        let media = api.resolve(&link).await.unwrap();
        assert_eq!(
            media.direct_url,
            format!("https://d.example/free/{}", link.as_str().len())
        );
    }
}
