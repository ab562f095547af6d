//! Last tier of every chain: products from the static fallback catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vitrine_core::{FallbackCatalog, Platform, Product, ProductDetail, Source};

use crate::adapter::{DetailStrategy, SearchRequest, SearchStrategy, Tier};
use crate::error::StrategyError;
use crate::normalize::{normalize, normalize_batch};
use crate::types::RawItem;

fn strategy_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Shopee => "shopee_fallback",
        Platform::Amazon => "amazon_fallback",
        Platform::MercadoLivre => "mercadolivre_fallback",
    }
}

/// Serves the platform's whole catalog list regardless of keywords or
/// filters.
#[derive(Debug, Clone)]
pub struct StaticFallbackSearch {
    platform: Platform,
    catalog: Arc<FallbackCatalog>,
}

impl StaticFallbackSearch {
    #[must_use]
    pub fn new(platform: Platform, catalog: Arc<FallbackCatalog>) -> Self {
        Self { platform, catalog }
    }
}

#[async_trait]
impl SearchStrategy for StaticFallbackSearch {
    fn name(&self) -> &'static str {
        strategy_name(self.platform)
    }

    fn tier(&self) -> Tier {
        Tier::Fallback
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, StrategyError> {
        let raws = self
            .catalog
            .items(self.platform)
            .iter()
            .cloned()
            .map(RawItem::Fallback);
        Ok(normalize_batch(self.platform, raws, request.fetched_at))
    }
}

/// Catalog entry with the requested identity; `Ok(None)` when absent.
#[derive(Debug, Clone)]
pub struct StaticFallbackDetails {
    platform: Platform,
    catalog: Arc<FallbackCatalog>,
}

impl StaticFallbackDetails {
    #[must_use]
    pub fn new(platform: Platform, catalog: Arc<FallbackCatalog>) -> Self {
        Self { platform, catalog }
    }
}

#[async_trait]
impl DetailStrategy for StaticFallbackDetails {
    fn name(&self) -> &'static str {
        strategy_name(self.platform)
    }

    fn tier(&self) -> Tier {
        Tier::Fallback
    }

    async fn details(
        &self,
        external_id: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Option<ProductDetail>, StrategyError> {
        let Some(item) = self.catalog.find(self.platform, external_id) else {
            return Ok(None);
        };
        let product = normalize(self.platform, &RawItem::Fallback(item.clone()), fetched_at)?;

        Ok(Some(ProductDetail {
            product,
            description: None,
            specifications: BTreeMap::new(),
            categories: Vec::new(),
            stock: None,
            shop_location: None,
            source: Source::Fallback,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::builtin_fallback_catalog;

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn search_returns_every_catalog_item_for_the_platform() {
        let catalog = Arc::new(builtin_fallback_catalog());
        let strategy = StaticFallbackSearch::new(Platform::Shopee, Arc::clone(&catalog));

        let mut request = SearchRequest::new("anything at all", ts());
        request.limit = 1;
        let products = strategy.search(&request).await.unwrap();

        assert_eq!(strategy.name(), "shopee_fallback");
        assert_eq!(strategy.tier(), Tier::Fallback);
        assert_eq!(products.len(), catalog.items(Platform::Shopee).len());
        assert!(products.iter().all(|p| p.platform == Platform::Shopee));
        assert!(products.iter().all(|p| p.fetched_at == ts()));
    }

    #[tokio::test]
    async fn details_look_up_by_identity() {
        let catalog = Arc::new(builtin_fallback_catalog());
        let known = catalog.items(Platform::Amazon)[0].external_id.clone();
        let strategy = StaticFallbackDetails::new(Platform::Amazon, catalog);

        let found = strategy.details(&known, ts()).await.unwrap().unwrap();
        assert_eq!(found.product.external_id, known);
        assert_eq!(found.source, Source::Fallback);

        assert!(strategy.details("B000000000", ts()).await.unwrap().is_none());
    }
}
