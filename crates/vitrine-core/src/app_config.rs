use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Affiliate program whose link format is used for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffiliateNetwork {
    /// Shopee links carrying `af_*`/`utm_*` parameters (Ecomobi format).
    Ecomobi,
    /// Shopee links wrapped in an Admitad deeplink.
    Admitad,
    /// Amazon Associates `tag` links.
    AmazonAssociates,
}

impl std::fmt::Display for AffiliateNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AffiliateNetwork::Ecomobi => write!(f, "ecomobi"),
            AffiliateNetwork::Admitad => write!(f, "admitad"),
            AffiliateNetwork::AmazonAssociates => write!(f, "amazon_associates"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// `None` keeps the cache in process memory.
    pub redis_url: Option<String>,
    pub cache_op_timeout_ms: u64,
    pub live_ttl_secs: u64,
    pub fallback_ttl_secs: u64,
    pub detail_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Outbound requests allowed in flight per platform.
    pub max_concurrent_requests: usize,
    pub session_pool_size: usize,
    pub shopee_base_url: String,
    pub amazon_base_url: String,
    pub amazon_paapi_url: String,
    pub amazon_region: String,
    pub shopee_affiliate_id: String,
    pub shopee_affiliate_network: AffiliateNetwork,
    pub amazon_associate_tag: String,
    pub amazon_access_key: Option<String>,
    pub amazon_secret_key: Option<String>,
    pub shortener_url: Option<String>,
    pub fallback_catalog_path: Option<PathBuf>,
}

impl AppConfig {
    /// PA-API credentials, present only when both halves are configured.
    #[must_use]
    pub fn amazon_credentials(&self) -> Option<(&str, &str)> {
        match (&self.amazon_access_key, &self.amazon_secret_key) {
            (Some(access), Some(secret)) => Some((access.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[redacted]"))
            .field("cache_op_timeout_ms", &self.cache_op_timeout_ms)
            .field("live_ttl_secs", &self.live_ttl_secs)
            .field("fallback_ttl_secs", &self.fallback_ttl_secs)
            .field("detail_ttl_secs", &self.detail_ttl_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("session_pool_size", &self.session_pool_size)
            .field("shopee_base_url", &self.shopee_base_url)
            .field("amazon_base_url", &self.amazon_base_url)
            .field("amazon_paapi_url", &self.amazon_paapi_url)
            .field("amazon_region", &self.amazon_region)
            .field("shopee_affiliate_id", &self.shopee_affiliate_id)
            .field("shopee_affiliate_network", &self.shopee_affiliate_network)
            .field("amazon_associate_tag", &self.amazon_associate_tag)
            .field(
                "amazon_access_key",
                &self.amazon_access_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "amazon_secret_key",
                &self.amazon_secret_key.as_ref().map(|_| "[redacted]"),
            )
            .field("shortener_url", &self.shortener_url)
            .field("fallback_catalog_path", &self.fallback_catalog_path)
            .finish()
    }
}
