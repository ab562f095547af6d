//! Cache-aside facade over the platform adapters.
//!
//! Searches and detail lookups consult the cache first, walk the adapter's
//! strategy chain on a miss, and store what they got with a TTL that depends
//! on where it came from: live data is kept for long, fallback data only
//! briefly so the next call soon retries the live strategies. Nothing here
//! retries; the chain is the only recovery mechanism.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use vitrine_cache::{Cache, CacheKey};
use vitrine_core::{
    AffiliateLink, AppConfig, FallbackReason, Platform, ProductDetail, ProductRef, SearchOptions,
    SearchResult, Source,
};
use vitrine_scraper::{
    is_valid_asin, parse_external_id, PlatformAdapter, ScraperError, SearchRequest,
};

use crate::error::AcquisitionError;
use crate::links::{validate_campaign_id, LinkGenerator};
use crate::registry::AdapterRegistry;

const MIN_QUERY_CHARS: usize = 2;
const MAX_LIMIT: u32 = 100;

/// Strategy name recorded when the whole chain came back empty-handed.
const NO_STRATEGY: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub live: Duration,
    pub fallback: Duration,
    pub detail: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            live: Duration::from_secs(1800),
            fallback: Duration::from_secs(120),
            detail: Duration::from_secs(3600),
        }
    }
}

impl CacheTtls {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            live: Duration::from_secs(config.live_ttl_secs),
            fallback: Duration::from_secs(config.fallback_ttl_secs),
            detail: Duration::from_secs(config.detail_ttl_secs),
        }
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    registry: AdapterRegistry,
    cache: Cache,
    links: LinkGenerator,
    ttls: CacheTtls,
}

impl Orchestrator {
    #[must_use]
    pub fn new(registry: AdapterRegistry, cache: Cache, links: LinkGenerator) -> Self {
        Self {
            registry,
            cache,
            links,
            ttls: CacheTtls::default(),
        }
    }

    #[must_use]
    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Search `options.platform` for `query`.
    ///
    /// Never fails for lack of results: when every live strategy is down the
    /// result carries the static fallback set tagged `fallback`.
    ///
    /// # Errors
    ///
    /// [`AcquisitionError::InvalidRequest`] for a bad query or options,
    /// [`AcquisitionError::Configuration`] for a platform without an adapter,
    /// [`AcquisitionError::Cancelled`] when `options.deadline` elapses.
    pub async fn search_products(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, AcquisitionError> {
        self.search_products_until(query, options, std::future::pending())
            .await
    }

    /// [`Orchestrator::search_products`] that also gives up as soon as
    /// `cancel` completes. An abandoned call writes nothing to the cache.
    ///
    /// # Errors
    ///
    /// As [`Orchestrator::search_products`].
    pub async fn search_products_until<C>(
        &self,
        query: &str,
        options: &SearchOptions,
        cancel: C,
    ) -> Result<SearchResult, AcquisitionError>
    where
        C: Future<Output = ()>,
    {
        let query = validate_search(query, options)?;
        let adapter = self.registry.get(options.platform)?;

        tokio::select! {
            biased;
            () = cancel => Err(cancelled("caller", options.platform, &query)),
            () = sleep_or_pending(options.deadline) => {
                Err(cancelled("deadline", options.platform, &query))
            }
            result = self.search_cache_aside(adapter, &query, options) => Ok(result),
        }
    }

    async fn search_cache_aside(
        &self,
        adapter: &PlatformAdapter,
        query: &str,
        options: &SearchOptions,
    ) -> SearchResult {
        let key = search_key(query, options);

        if let Some(mut cached) = self.cache.get::<SearchResult>(&key).await {
            if cached.source == Source::Live {
                cached.source = Source::Cache;
            }
            cached.query = query.to_owned();
            tracing::info!(
                platform = %options.platform,
                query,
                source = %cached.source,
                strategy = %cached.strategy,
                count = cached.products.len(),
                "search served from cache"
            );
            return cached;
        }

        let fetched_at = Utc::now();
        let request = SearchRequest::from_options(query, options, fetched_at);
        let result = match adapter.search(&request).await {
            Ok(outcome) => SearchResult {
                products: outcome.products,
                source: outcome.tier.source(),
                query: query.to_owned(),
                fetched_at,
                strategy: outcome.strategy.to_owned(),
                fallback_reason: outcome.fallback_reason,
            },
            Err(e) => {
                tracing::error!(platform = %options.platform, query, error = %e, "search chain produced nothing");
                return SearchResult {
                    products: Vec::new(),
                    source: Source::Fallback,
                    query: query.to_owned(),
                    fetched_at,
                    strategy: NO_STRATEGY.to_owned(),
                    fallback_reason: Some(FallbackReason::UpstreamFailed),
                };
            }
        };

        let ttl = match result.source {
            Source::Live => self.ttls.live,
            Source::Cache | Source::Fallback => self.ttls.fallback,
        };
        self.cache.set(&key, &result, ttl).await;

        tracing::info!(
            platform = %options.platform,
            query,
            source = %result.source,
            strategy = %result.strategy,
            count = result.products.len(),
            "search completed"
        );
        result
    }

    /// Full record for one product.
    ///
    /// # Errors
    ///
    /// [`AcquisitionError::Configuration`] for a platform without an adapter,
    /// [`AcquisitionError::InvalidRequest`] for a malformed id,
    /// [`AcquisitionError::NotFound`] when no strategy can produce it.
    pub async fn get_product_details(
        &self,
        platform: Platform,
        external_id: &str,
    ) -> Result<ProductDetail, AcquisitionError> {
        let adapter = self.registry.get(platform)?;
        let external_id = external_id.trim();
        validate_external_id(platform, external_id)?;

        let key = CacheKey::builder("detail")
            .segment(platform.as_str())
            .segment(external_id)
            .build();

        if let Some(mut cached) = self.cache.get::<ProductDetail>(&key).await {
            if cached.source == Source::Live {
                cached.source = Source::Cache;
            }
            tracing::info!(%platform, external_id, source = %cached.source, "details served from cache");
            return Ok(cached);
        }

        match adapter.details(external_id, Utc::now()).await {
            Ok(detail) => {
                let ttl = match detail.source {
                    Source::Live => self.ttls.detail,
                    Source::Cache | Source::Fallback => self.ttls.fallback,
                };
                self.cache.set(&key, &detail, ttl).await;
                Ok(detail)
            }
            Err(ScraperError::InvalidExternalId { reason, .. }) => Err(
                AcquisitionError::InvalidRequest(format!("{platform} id {external_id:?}: {reason}")),
            ),
            Err(e) => {
                tracing::info!(%platform, external_id, error = %e, "product details unavailable");
                Err(AcquisitionError::NotFound(ProductRef::new(
                    platform,
                    external_id,
                )))
            }
        }
    }

    /// Resolve `product` and build a tracked link to it.
    ///
    /// # Errors
    ///
    /// [`AcquisitionError::InvalidRequest`] for a bad campaign id, otherwise
    /// whatever [`Orchestrator::get_product_details`] reports.
    pub async fn generate_affiliate_link(
        &self,
        product: &ProductRef,
        campaign_id: &str,
    ) -> Result<AffiliateLink, AcquisitionError> {
        validate_campaign_id(campaign_id)?;
        let detail = self
            .get_product_details(product.platform, &product.external_id)
            .await?;
        Ok(self.links.generate(&detail.product, campaign_id).await?)
    }
}

/// Returns the trimmed query.
fn validate_search(query: &str, options: &SearchOptions) -> Result<String, AcquisitionError> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return Err(AcquisitionError::InvalidRequest(format!(
            "query must be at least {MIN_QUERY_CHARS} characters"
        )));
    }
    if !(1..=MAX_LIMIT).contains(&options.limit) {
        return Err(AcquisitionError::InvalidRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {}",
            options.limit
        )));
    }
    if options.page == 0 {
        return Err(AcquisitionError::InvalidRequest(
            "page numbers start at 1".to_owned(),
        ));
    }
    if options.min_price.is_some_and(|p| p < 0) || options.max_price.is_some_and(|p| p < 0) {
        return Err(AcquisitionError::InvalidRequest(
            "price bounds must not be negative".to_owned(),
        ));
    }
    if let (Some(min), Some(max)) = (options.min_price, options.max_price) {
        if min > max {
            return Err(AcquisitionError::InvalidRequest(format!(
                "min_price {min} exceeds max_price {max}"
            )));
        }
    }
    Ok(query.to_owned())
}

fn validate_external_id(platform: Platform, external_id: &str) -> Result<(), AcquisitionError> {
    let valid = match platform {
        Platform::Shopee => parse_external_id(external_id).is_some(),
        Platform::Amazon => is_valid_asin(external_id),
        Platform::MercadoLivre => !external_id.is_empty(),
    };
    if valid {
        Ok(())
    } else {
        Err(AcquisitionError::InvalidRequest(format!(
            "{external_id:?} is not a valid {platform} product id"
        )))
    }
}

fn search_key(query: &str, options: &SearchOptions) -> CacheKey {
    CacheKey::builder("search")
        .segment(options.platform.as_str())
        .keywords(query)
        .param("page", options.page)
        .param("limit", options.limit)
        .param_opt("min", options.min_price)
        .param_opt("max", options.max_price)
        .build()
}

async fn sleep_or_pending(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}

fn cancelled(cause: &'static str, platform: Platform, query: &str) -> AcquisitionError {
    tracing::warn!(%platform, query, cause, "search abandoned; nothing cached");
    AcquisitionError::Cancelled { cause }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
