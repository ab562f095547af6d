//! Assembly of the per-platform fallback chains from configuration.

use std::sync::Arc;
use std::time::Duration;

use vitrine_core::{AppConfig, FallbackCatalog, Platform};

use crate::adapter::PlatformAdapter;
use crate::amazon::{
    AmazonHtmlSearch, AmazonPaapiDetails, AmazonPaapiSearch, AmazonProductPage, PaapiClient,
    PaapiCredentials,
};
use crate::client::{build_http_client, extract_host};
use crate::error::ScraperError;
use crate::fallback::{StaticFallbackDetails, StaticFallbackSearch};
use crate::rate_limit::PlatformLimiter;
use crate::session::SessionPool;
use crate::shopee::{
    ShopeeApi, ShopeeFlashSale, ShopeeHtmlSearch, ShopeeItemApi, ShopeeRecommend, ShopeeSearchApi,
};

fn request_timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.request_timeout_secs)
}

fn session_pool(config: &AppConfig, platform: Platform, base_url: &str) -> SessionPool {
    SessionPool::new(
        platform,
        format!("{}/", base_url.trim_end_matches('/')),
        config.user_agent.clone(),
        request_timeout(config),
        config.session_pool_size,
    )
}

/// `shopee_search_api` → `shopee_recommend` → `shopee_flash_sale` →
/// `shopee_html` → `shopee_fallback`; details via `item/get`, then the
/// catalog.
///
/// # Errors
///
/// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
pub fn shopee_adapter(
    config: &AppConfig,
    catalog: Arc<FallbackCatalog>,
) -> Result<PlatformAdapter, ScraperError> {
    let client = build_http_client(request_timeout(config), &config.user_agent)?;
    let api = ShopeeApi::new(client, config.shopee_base_url.clone());
    let pool = session_pool(config, Platform::Shopee, &config.shopee_base_url);

    Ok(PlatformAdapter::new(
        Platform::Shopee,
        PlatformLimiter::new(Platform::Shopee, config.max_concurrent_requests),
        request_timeout(config),
    )
    .with_search_strategy(ShopeeSearchApi::new(api.clone()))
    .with_search_strategy(ShopeeRecommend::new(api.clone()))
    .with_search_strategy(ShopeeFlashSale::new(api.clone()))
    .with_search_strategy(ShopeeHtmlSearch::new(pool, config.shopee_base_url.clone()))
    .with_search_strategy(StaticFallbackSearch::new(Platform::Shopee, Arc::clone(&catalog)))
    .with_detail_strategy(ShopeeItemApi::new(api))
    .with_detail_strategy(StaticFallbackDetails::new(Platform::Shopee, catalog)))
}

/// `amazon_paapi` (only with credentials) → `amazon_html` →
/// `amazon_fallback`; details via `GetItems`, the `/dp` page, then the
/// catalog.
///
/// # Errors
///
/// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
pub fn amazon_adapter(
    config: &AppConfig,
    catalog: Arc<FallbackCatalog>,
) -> Result<PlatformAdapter, ScraperError> {
    let pool = session_pool(config, Platform::Amazon, &config.amazon_base_url);
    let mut adapter = PlatformAdapter::new(
        Platform::Amazon,
        PlatformLimiter::new(Platform::Amazon, config.max_concurrent_requests),
        request_timeout(config),
    );

    let paapi = match config.amazon_credentials() {
        Some((access_key, secret_key)) => {
            let client = build_http_client(request_timeout(config), &config.user_agent)?;
            Some(PaapiClient::new(
                client,
                &config.amazon_paapi_url,
                PaapiCredentials {
                    access_key: access_key.to_owned(),
                    secret_key: secret_key.to_owned(),
                    region: config.amazon_region.clone(),
                },
                config.amazon_associate_tag.clone(),
                extract_host(&config.amazon_base_url),
            ))
        }
        None => {
            tracing::warn!("AMAZON_ACCESS_KEY/AMAZON_SECRET_KEY not set; amazon_paapi disabled");
            None
        }
    };

    if let Some(paapi) = &paapi {
        adapter = adapter.with_search_strategy(AmazonPaapiSearch::new(paapi.clone()));
    }
    adapter = adapter
        .with_search_strategy(AmazonHtmlSearch::new(pool.clone(), config.amazon_base_url.clone()))
        .with_search_strategy(StaticFallbackSearch::new(Platform::Amazon, Arc::clone(&catalog)));

    if let Some(paapi) = paapi {
        adapter = adapter.with_detail_strategy(AmazonPaapiDetails::new(paapi));
    }
    Ok(adapter
        .with_detail_strategy(AmazonProductPage::new(pool, config.amazon_base_url.clone()))
        .with_detail_strategy(StaticFallbackDetails::new(Platform::Amazon, catalog)))
}
