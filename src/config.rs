use anyhow::Result;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::resolver::ProviderKind;

pub static CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot_token: String,
    /// Externally reachable base URL. Without it the bot long-polls instead.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_provider_order")]
    pub provider_order: Vec<ProviderKind>,
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_secs: u64,
    #[serde(default = "default_worker_base")]
    pub worker_base: String,
    #[serde(default = "default_thory_base")]
    pub thory_base: String,
    #[serde(default = "default_pro_base")]
    pub pro_base: String,
}

fn default_port() -> u16 {
    8080
}

fn default_provider_order() -> Vec<ProviderKind> {
    vec![ProviderKind::Pro, ProviderKind::Worker, ProviderKind::Thory]
}

fn default_provider_timeout() -> u64 {
    15
}

fn default_delivery_timeout() -> u64 {
    60
}

fn default_worker_base() -> String {
    "https://tera.iqbalalam8675.workers.dev/".into()
}

fn default_thory_base() -> String {
    "https://teraboxapi.thory.workers.dev/api".into()
}

fn default_pro_base() -> String {
    "https://terabox-pro-api.vercel.app/api".into()
}

impl Config {
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw().only(&["bot_token", "webhook_url", "webhook_secret", "port"]))
            .merge(Env::prefixed("TERARELAY_"))
    }

    pub fn get_config() -> Result<Self> {
        Ok(Self::figment().extract()?)
    }

    /// Full URL Telegram should push updates to, if running in webhook mode
    pub fn webhook_endpoint(&self) -> Option<String> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .map(|base| format!("{}/webhook", base.trim_end_matches('/')))
    }
}
