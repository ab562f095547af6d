//! End-to-end: every live Shopee strategy is down, the static catalog
//! answers, and the brief fallback TTL lets live strategies be retried soon.

use std::collections::HashMap;
use std::env::VarError;
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitrine_acquisition::{AdapterRegistry, AffiliateAccounts, LinkGenerator, Orchestrator};
use vitrine_cache::{Cache, ManualClock, MemoryStore};
use vitrine_core::{
    build_app_config, builtin_fallback_catalog, AppConfig, FallbackReason, Platform,
    ProductRef, SearchOptions, Source,
};
use vitrine_scraper::shopee_adapter;

fn config_for(server: &MockServer) -> AppConfig {
    let map: HashMap<&str, String> = HashMap::from([
        ("VITRINE_SHOPEE_BASE_URL", server.uri()),
        ("SHOPEE_AFFILIATE_ID", "aff-e2e".to_owned()),
    ]);
    build_app_config(|key| map.get(key).cloned().ok_or(VarError::NotPresent)).unwrap()
}

fn orchestrator(config: &AppConfig, clock: &ManualClock) -> Orchestrator {
    let adapter = shopee_adapter(config, Arc::new(builtin_fallback_catalog())).unwrap();
    Orchestrator::new(
        AdapterRegistry::new().with_adapter(adapter),
        Cache::new(Arc::new(MemoryStore::with_clock(clock.clone()))),
        LinkGenerator::new(AffiliateAccounts::from_config(config)),
    )
}

async fn upstream_requests(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

#[tokio::test]
async fn fone_bluetooth_served_from_catalog_then_retried_after_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let clock = ManualClock::new();
    let orchestrator = orchestrator(&config_for(&server), &clock);
    let options = SearchOptions::for_platform(Platform::Shopee);

    let first = orchestrator
        .search_products("fone bluetooth", &options)
        .await
        .unwrap();
    assert_eq!(first.source, Source::Fallback);
    assert_eq!(first.strategy, "shopee_fallback");
    assert_eq!(first.fallback_reason, Some(FallbackReason::UpstreamFailed));
    assert_eq!(first.products.len(), 5);
    let ids: Vec<&str> = first.products.iter().map(|p| p.external_id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "123456789_987654321",
            "234567890_876543210",
            "345678901_765432109",
            "456789012_654321098",
            "567890123_543210987"
        ]
    );

    let after_first = upstream_requests(&server).await;
    assert!(after_first > 0);

    clock.advance(Duration::from_secs(119));
    let second = orchestrator
        .search_products("fone bluetooth", &options)
        .await
        .unwrap();
    assert_eq!(second.source, Source::Fallback);
    assert_eq!(second.products, first.products);
    assert_eq!(upstream_requests(&server).await, after_first);

    clock.advance(Duration::from_secs(2));
    let third = orchestrator
        .search_products("fone bluetooth", &options)
        .await
        .unwrap();
    assert_eq!(third.source, Source::Fallback);
    assert!(upstream_requests(&server).await > after_first);
}

#[tokio::test]
async fn affiliate_link_for_catalog_product_while_upstream_is_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let clock = ManualClock::new();
    let orchestrator = orchestrator(&config_for(&server), &clock);
    let product = ProductRef::new(Platform::Shopee, "123456789_987654321");

    let detail = orchestrator
        .get_product_details(Platform::Shopee, &product.external_id)
        .await
        .unwrap();
    assert_eq!(detail.source, Source::Fallback);

    let link = orchestrator
        .generate_affiliate_link(&product, "e2e")
        .await
        .unwrap();
    assert_eq!(link.product_ref, product);
    assert!(link.url.contains("af_id=aff-e2e"));
    assert!(link.url.contains("af_sub1=e2e"));
}
