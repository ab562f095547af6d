//! Affiliate link generation.
//!
//! Links are deterministic apart from the tracking id, which combines the
//! wall clock, a per-generator sequence number and 32 random bits so two
//! calls for the same product and campaign never collide.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Url;
use vitrine_core::{AffiliateLink, AffiliateNetwork, AppConfig, Platform, Product};

use crate::error::LinkError;
use crate::shortener::UrlShortener;

const ADMITAD_BASE: &str = "https://ad.admitad.com/g";
const MAX_CAMPAIGN_LEN: usize = 64;
const SUB_SOURCE: &str = "vitrine";

/// Affiliate identities for each program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliateAccounts {
    pub shopee_affiliate_id: String,
    /// [`AffiliateNetwork::Ecomobi`] or [`AffiliateNetwork::Admitad`].
    pub shopee_network: AffiliateNetwork,
    pub amazon_associate_tag: String,
}

impl AffiliateAccounts {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            shopee_affiliate_id: config.shopee_affiliate_id.clone(),
            shopee_network: config.shopee_affiliate_network,
            amazon_associate_tag: config.amazon_associate_tag.clone(),
        }
    }
}

pub struct LinkGenerator {
    accounts: AffiliateAccounts,
    shortener: Option<Arc<dyn UrlShortener>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for LinkGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkGenerator")
            .field("accounts", &self.accounts)
            .field("shortener", &self.shortener.is_some())
            .finish_non_exhaustive()
    }
}

impl LinkGenerator {
    #[must_use]
    pub fn new(accounts: AffiliateAccounts) -> Self {
        Self {
            accounts,
            shortener: None,
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_shortener(mut self, shortener: Arc<dyn UrlShortener>) -> Self {
        self.shortener = Some(shortener);
        self
    }

    /// Build a tracked link for `product`, shortened when a shortener is
    /// configured and answers.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] for an invalid campaign id, a product URL that
    /// cannot carry query parameters, or a platform without an affiliate
    /// program.
    pub async fn generate(
        &self,
        product: &Product,
        campaign_id: &str,
    ) -> Result<AffiliateLink, LinkError> {
        validate_campaign_id(campaign_id)?;

        let created_at = Utc::now();
        let tracking_id = self.next_tracking_id(created_at);
        let (url, network) = self.tracked_url(product, campaign_id, &tracking_id)?;

        let short_url = match &self.shortener {
            Some(shortener) => match shortener.shorten(&url).await {
                Ok(short) => Some(short),
                Err(e) => {
                    tracing::warn!(
                        platform = %product.platform,
                        external_id = %product.external_id,
                        error = %e,
                        "url shortening failed; keeping long link"
                    );
                    None
                }
            },
            None => None,
        };

        tracing::info!(
            platform = %product.platform,
            external_id = %product.external_id,
            campaign_id,
            tracking_id = %tracking_id,
            network = %network,
            shortened = short_url.is_some(),
            "affiliate link generated"
        );

        Ok(AffiliateLink {
            product_ref: product.product_ref(),
            campaign_id: campaign_id.to_owned(),
            tracking_id,
            url,
            short_url,
            network,
            created_at,
        })
    }

    /// The long tracked URL and the network whose format it follows.
    ///
    /// # Errors
    ///
    /// See [`LinkGenerator::generate`].
    pub fn tracked_url(
        &self,
        product: &Product,
        campaign_id: &str,
        tracking_id: &str,
    ) -> Result<(String, AffiliateNetwork), LinkError> {
        let mut url = parse_product_url(&product.url)?;

        let network = match product.platform {
            Platform::Shopee => self.accounts.shopee_network,
            Platform::Amazon => AffiliateNetwork::AmazonAssociates,
            Platform::MercadoLivre => {
                return Err(LinkError::UnsupportedPlatform(product.platform));
            }
        };

        match network {
            AffiliateNetwork::Ecomobi => {
                url.query_pairs_mut()
                    .append_pair("af_id", &self.accounts.shopee_affiliate_id)
                    .append_pair("af_sub1", campaign_id)
                    .append_pair("af_sub2", SUB_SOURCE)
                    .append_pair("utm_source", "ecomobi")
                    .append_pair("utm_medium", "affiliate")
                    .append_pair("utm_campaign", campaign_id)
                    .append_pair("clickid", tracking_id);
            }
            AffiliateNetwork::Admitad => {
                let mut deeplink = admitad_base(&self.accounts.shopee_affiliate_id)?;
                deeplink
                    .query_pairs_mut()
                    .append_pair("ulp", url.as_str())
                    .append_pair("subid", campaign_id)
                    .append_pair("subid1", tracking_id);
                url = deeplink;
            }
            AffiliateNetwork::AmazonAssociates => {
                url.query_pairs_mut()
                    .append_pair("tag", &self.accounts.amazon_associate_tag)
                    .append_pair("linkCode", "as2")
                    .append_pair("creativeASIN", &product.external_id)
                    .append_pair("ascsubtag", &format!("{campaign_id}_{tracking_id}"));
            }
        }

        Ok((url.into(), network))
    }

    fn next_tracking_id(&self, now: DateTime<Utc>) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{seq}-{:08x}",
            now.timestamp_millis(),
            rand::random::<u32>()
        )
    }
}

/// Campaign ids end up verbatim in partner dashboards.
///
/// # Errors
///
/// Returns [`LinkError::InvalidCampaignId`] unless the id is 1-64 characters
/// of ASCII letters, digits, `_` or `-`.
pub fn validate_campaign_id(campaign_id: &str) -> Result<(), LinkError> {
    let valid = !campaign_id.is_empty()
        && campaign_id.len() <= MAX_CAMPAIGN_LEN
        && campaign_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(LinkError::InvalidCampaignId(campaign_id.to_owned()))
    }
}

fn parse_product_url(raw: &str) -> Result<Url, LinkError> {
    Url::parse(raw)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .ok_or_else(|| LinkError::InvalidProductUrl {
            url: raw.to_owned(),
        })
}

fn admitad_base(affiliate_id: &str) -> Result<Url, LinkError> {
    let raw = format!("{ADMITAD_BASE}/{affiliate_id}/");
    Url::parse(&raw).map_err(|_| LinkError::InvalidProductUrl { url: raw })
}

#[cfg(test)]
#[path = "links_test.rs"]
mod tests;
