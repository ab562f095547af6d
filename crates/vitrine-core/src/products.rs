use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_config::AffiliateNetwork;
use crate::ConfigError;

/// E-commerce marketplace a product was acquired from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Shopee,
    Amazon,
    MercadoLivre,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Shopee, Platform::Amazon, Platform::MercadoLivre];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Shopee => "shopee",
            Platform::Amazon => "amazon",
            Platform::MercadoLivre => "mercadolivre",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == lowered)
            .ok_or_else(|| ConfigError::UnknownPlatform(s.to_owned()))
    }
}

/// Identity of a product: unique within its platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductRef {
    pub platform: Platform,
    pub external_id: String,
}

impl ProductRef {
    #[must_use]
    pub fn new(platform: Platform, external_id: impl Into<String>) -> Self {
        Self {
            platform,
            external_id: external_id.into(),
        }
    }
}

impl std::fmt::Display for ProductRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.platform, self.external_id)
    }
}

#[derive(Debug, Error)]
#[error("cannot refresh {current} from a different product {incoming}")]
pub struct IdentityMismatch {
    pub current: ProductRef,
    pub incoming: ProductRef,
}

/// A product normalized from any platform into one canonical shape.
///
/// Money values are integer minor units of `currency` (centavos for `BRL`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub platform: Platform,
    /// Upstream identifier, unique within `platform`.
    pub external_id: String,
    pub name: String,
    pub price: i64,
    /// ISO 4217 code, e.g. `"BRL"`.
    pub currency: String,
    pub original_price: Option<i64>,
    pub discount_percent: Option<u8>,
    pub images: Vec<String>,
    pub primary_image: Option<String>,
    /// Average star rating in `[0, 5]`; `None` when the upstream has none.
    pub rating: Option<f32>,
    pub sold_count: u64,
    /// Canonical upstream product page.
    pub url: String,
    pub seller_name: Option<String>,
    pub seller_rating: Option<f32>,
    pub fetched_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub fn product_ref(&self) -> ProductRef {
        ProductRef::new(self.platform, self.external_id.clone())
    }

    /// Overwrites the mutable fields with those of a newer fetch of the same
    /// product. Identity (`platform`, `external_id`) is never touched.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityMismatch`] when `newer` is a different product.
    pub fn refresh_from(&mut self, newer: Product) -> Result<(), IdentityMismatch> {
        if newer.platform != self.platform || newer.external_id != self.external_id {
            return Err(IdentityMismatch {
                current: self.product_ref(),
                incoming: newer.product_ref(),
            });
        }

        self.name = newer.name;
        self.price = newer.price;
        self.currency = newer.currency;
        self.original_price = newer.original_price;
        self.discount_percent = newer.discount_percent;
        self.images = newer.images;
        self.primary_image = newer.primary_image;
        self.rating = newer.rating;
        self.sold_count = newer.sold_count;
        self.url = newer.url;
        self.seller_name = newer.seller_name;
        self.seller_rating = newer.seller_rating;
        self.fetched_at = newer.fetched_at;
        Ok(())
    }
}

/// Discount of `price` relative to `original_price`, rounded to the nearest
/// whole percent. `None` unless `original_price > price > 0`.
#[must_use]
pub fn derive_discount_percent(price: i64, original_price: i64) -> Option<u8> {
    if price <= 0 || original_price <= price {
        return None;
    }
    let off = original_price - price;
    let pct = (off * 100 + original_price / 2) / original_price;
    u8::try_from(pct).ok()
}

/// Which tier produced the data handed back to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Live,
    Cache,
    Fallback,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Live => write!(f, "live"),
            Source::Cache => write!(f, "cache"),
            Source::Fallback => write!(f, "fallback"),
        }
    }
}

/// Why a result came from the static fallback tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Every live strategy answered, all with zero items.
    NoResults,
    /// At least one live strategy failed outright.
    UpstreamFailed,
}

/// Caller-supplied search parameters. Prices are minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub platform: Platform,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub limit: u32,
    /// 1-based page number.
    pub page: u32,
    /// Upper bound on the whole call, cache round-trips included.
    pub deadline: Option<Duration>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            platform: Platform::Shopee,
            min_price: None,
            max_price: None,
            limit: 20,
            page: 1,
            deadline: None,
        }
    }
}

impl SearchOptions {
    #[must_use]
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub products: Vec<Product>,
    pub source: Source,
    pub query: String,
    pub fetched_at: DateTime<Utc>,
    /// Name of the strategy that produced `products`, e.g. `"shopee_html"`.
    pub strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    pub product: Product,
    pub description: Option<String>,
    /// Attribute name to value, in name order.
    pub specifications: BTreeMap<String, String>,
    pub categories: Vec<String>,
    pub stock: Option<u64>,
    pub shop_location: Option<String>,
    pub source: Source,
}

/// A trackable link for one product and campaign. Immutable once created;
/// regenerating yields a new `tracking_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateLink {
    pub product_ref: ProductRef,
    pub campaign_id: String,
    pub tracking_id: String,
    pub url: String,
    pub short_url: Option<String>,
    pub network: AffiliateNetwork,
    pub created_at: DateTime<Utc>,
}
