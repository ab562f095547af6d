//! Process-wide assembly of the acquisition layer from [`AppConfig`].

use std::sync::Arc;
use std::time::Duration;

use vitrine_cache::{Cache, RedisStore};
use vitrine_core::{builtin_fallback_catalog, load_fallback_catalog, AppConfig, FallbackCatalog};
use vitrine_scraper::{amazon_adapter, build_http_client, shopee_adapter};

use crate::error::BuildError;
use crate::links::{AffiliateAccounts, LinkGenerator};
use crate::orchestrator::{CacheTtls, Orchestrator};
use crate::registry::AdapterRegistry;
use crate::shortener::HttpShortener;

/// Build the orchestrator a process serves from.
///
/// An unreachable Redis is not fatal: the cache is disabled and every call
/// goes to the adapters.
///
/// # Errors
///
/// Returns [`BuildError`] if the fallback catalog override cannot be loaded
/// or an HTTP client cannot be built.
pub async fn build_from_config(config: &AppConfig) -> Result<Orchestrator, BuildError> {
    let catalog = Arc::new(fallback_catalog(config)?);

    let registry = AdapterRegistry::new()
        .with_adapter(shopee_adapter(config, Arc::clone(&catalog))?)
        .with_adapter(amazon_adapter(config, catalog)?);

    let mut links = LinkGenerator::new(AffiliateAccounts::from_config(config));
    if let Some(endpoint) = &config.shortener_url {
        let client = build_http_client(
            Duration::from_secs(config.request_timeout_secs),
            &config.user_agent,
        )?;
        links = links.with_shortener(Arc::new(HttpShortener::new(client, endpoint.clone())));
    }

    let cache = connect_cache(config).await;
    tracing::info!(
        backend = cache.backend(),
        platforms = ?registry.platforms(),
        shortener = config.shortener_url.is_some(),
        "acquisition layer ready"
    );

    Ok(Orchestrator::new(registry, cache, links).with_ttls(CacheTtls::from_config(config)))
}

fn fallback_catalog(config: &AppConfig) -> Result<FallbackCatalog, BuildError> {
    match &config.fallback_catalog_path {
        Some(path) => {
            let catalog = load_fallback_catalog(path)?;
            tracing::info!(path = %path.display(), "loaded fallback catalog override");
            Ok(catalog)
        }
        None => Ok(builtin_fallback_catalog()),
    }
}

async fn connect_cache(config: &AppConfig) -> Cache {
    let Some(url) = &config.redis_url else {
        return Cache::in_memory();
    };

    match RedisStore::connect(url, Duration::from_millis(config.cache_op_timeout_ms)).await {
        Ok(store) => Cache::new(Arc::new(store)),
        Err(e) => {
            tracing::warn!(error = %e, "redis unreachable at startup; caching disabled");
            Cache::disabled()
        }
    }
}
