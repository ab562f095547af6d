use super::*;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;
use vitrine_cache::{ManualClock, MemoryStore};
use vitrine_core::{AffiliateNetwork, Product};
use vitrine_scraper::{
    DetailStrategy, PlatformLimiter, SearchStrategy, StrategyError, Tier,
};

use crate::links::AffiliateAccounts;

fn product(id: &str, price: i64) -> Product {
    Product {
        platform: Platform::Shopee,
        external_id: id.to_owned(),
        name: format!("Fone {id}"),
        price,
        currency: "BRL".to_owned(),
        original_price: None,
        discount_percent: None,
        images: vec![],
        primary_image: None,
        rating: None,
        sold_count: 0,
        url: format!("https://shopee.com.br/product/{}", id.replace('_', "/")),
        seller_name: None,
        seller_rating: None,
        fetched_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

#[derive(Clone)]
enum Behaviour {
    Products(Vec<Product>),
    Fail,
    Hang,
}

/// A strategy whose answer can be changed between calls.
#[derive(Clone)]
struct Switchable {
    name: &'static str,
    tier: Tier,
    behaviour: Arc<Mutex<Behaviour>>,
    calls: Arc<AtomicUsize>,
}

impl Switchable {
    fn new(name: &'static str, tier: Tier, behaviour: Behaviour) -> Self {
        Self {
            name,
            tier,
            behaviour: Arc::new(Mutex::new(behaviour)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn set(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn current(&self) -> Behaviour {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behaviour.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchStrategy for Switchable {
    fn name(&self) -> &'static str {
        self.name
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    async fn search(&self, _request: &SearchRequest) -> Result<Vec<Product>, StrategyError> {
        match self.current() {
            Behaviour::Products(products) => Ok(products),
            Behaviour::Fail => Err(StrategyError::UpstreamStatus {
                status: 503,
                url: "http://upstream.test".to_owned(),
            }),
            Behaviour::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl DetailStrategy for Switchable {
    fn name(&self) -> &'static str {
        self.name
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    async fn details(
        &self,
        external_id: &str,
        _fetched_at: DateTime<Utc>,
    ) -> Result<Option<ProductDetail>, StrategyError> {
        match self.current() {
            Behaviour::Products(products) => Ok(products
                .into_iter()
                .find(|p| p.external_id == external_id)
                .map(|product| ProductDetail {
                    product,
                    description: Some("Fone sem fio".to_owned()),
                    specifications: BTreeMap::new(),
                    categories: vec![],
                    stock: Some(3),
                    shop_location: None,
                    source: Source::Cache,
                })),
            Behaviour::Fail => Err(StrategyError::Timeout { timeout_ms: 1 }),
            Behaviour::Hang => std::future::pending().await,
        }
    }
}

struct Fixture {
    orchestrator: Orchestrator,
    live: Switchable,
    fallback: Switchable,
    clock: ManualClock,
    store: Arc<MemoryStore>,
}

fn fixture(live: Behaviour, fallback: Behaviour) -> Fixture {
    let live = Switchable::new("stub_live", Tier::Live, live);
    let fallback = Switchable::new("stub_fallback", Tier::Fallback, fallback);

    let adapter = PlatformAdapter::new(
        Platform::Shopee,
        PlatformLimiter::new(Platform::Shopee, 2),
        Duration::from_secs(5),
    )
    .with_search_strategy(live.clone())
    .with_search_strategy(fallback.clone())
    .with_detail_strategy(live.clone());

    let clock = ManualClock::new();
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let links = LinkGenerator::new(AffiliateAccounts {
        shopee_affiliate_id: "aff1".to_owned(),
        shopee_network: AffiliateNetwork::Ecomobi,
        amazon_associate_tag: "vitrine-20".to_owned(),
    });

    Fixture {
        orchestrator: Orchestrator::new(
            AdapterRegistry::new().with_adapter(adapter),
            Cache::new(store.clone()),
            links,
        ),
        live,
        fallback,
        clock,
        store,
    }
}

fn live_products() -> Behaviour {
    Behaviour::Products(vec![product("1_10", 8_990), product("1_11", 12_900)])
}

fn fallback_products() -> Behaviour {
    Behaviour::Products(vec![product("9_90", 4_990)])
}

fn options() -> SearchOptions {
    SearchOptions::for_platform(Platform::Shopee)
}

// ---------------------------------------------------------------------------
// validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_requests_are_rejected_before_any_strategy_runs() {
    let f = fixture(live_products(), fallback_products());

    let bad: Vec<(&str, SearchOptions)> = vec![
        ("  f ", options()),
        ("fone", SearchOptions { limit: 0, ..options() }),
        ("fone", SearchOptions { limit: 101, ..options() }),
        ("fone", SearchOptions { page: 0, ..options() }),
        (
            "fone",
            SearchOptions {
                min_price: Some(5_000),
                max_price: Some(1_000),
                ..options()
            },
        ),
        ("fone", SearchOptions { min_price: Some(-1), ..options() }),
    ];

    for (query, opts) in bad {
        let err = f.orchestrator.search_products(query, &opts).await.unwrap_err();
        assert!(
            matches!(err, AcquisitionError::InvalidRequest(_)),
            "expected InvalidRequest for {query:?} / {opts:?}, got: {err:?}"
        );
    }
    assert_eq!(f.live.calls(), 0);
}

#[tokio::test]
async fn platform_without_adapter_is_a_configuration_error() {
    let f = fixture(live_products(), fallback_products());
    let err = f
        .orchestrator
        .search_products("fone", &SearchOptions::for_platform(Platform::Amazon))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AcquisitionError::Configuration(vitrine_core::ConfigError::UnsupportedPlatform(
            Platform::Amazon
        ))
    ));
}

// ---------------------------------------------------------------------------
// cache-aside
// ---------------------------------------------------------------------------

#[tokio::test]
async fn live_result_is_cached_and_served_as_cache() {
    let f = fixture(live_products(), fallback_products());

    let first = f.orchestrator.search_products("Fone Bluetooth", &options()).await.unwrap();
    assert_eq!(first.source, Source::Live);
    assert_eq!(first.strategy, "stub_live");
    assert_eq!(first.products.len(), 2);

    let second = f
        .orchestrator
        .search_products("  fone   bluetooth ", &options())
        .await
        .unwrap();
    assert_eq!(second.source, Source::Cache);
    assert_eq!(second.products, first.products);
    assert_eq!(second.query, "fone   bluetooth");
    assert_eq!(f.live.calls(), 1);

    f.clock.advance(Duration::from_secs(1801));
    let third = f.orchestrator.search_products("fone bluetooth", &options()).await.unwrap();
    assert_eq!(third.source, Source::Live);
    assert_eq!(f.live.calls(), 2);
}

#[tokio::test]
async fn fallback_result_is_cached_briefly() {
    let f = fixture(Behaviour::Fail, fallback_products());

    let first = f.orchestrator.search_products("fone", &options()).await.unwrap();
    assert_eq!(first.source, Source::Fallback);
    assert_eq!(first.fallback_reason, Some(FallbackReason::UpstreamFailed));

    f.clock.advance(Duration::from_secs(60));
    let second = f.orchestrator.search_products("fone", &options()).await.unwrap();
    assert_eq!(second.source, Source::Fallback);
    assert_eq!(f.live.calls(), 1);
    assert_eq!(f.fallback.calls(), 1);

    f.live.set(live_products());
    f.clock.advance(Duration::from_secs(61));
    let third = f.orchestrator.search_products("fone", &options()).await.unwrap();
    assert_eq!(third.source, Source::Live);
    assert_eq!(f.live.calls(), 2);
}

#[tokio::test]
async fn genuine_zero_results_are_tagged_no_results() {
    let f = fixture(Behaviour::Products(vec![]), fallback_products());
    let result = f.orchestrator.search_products("fone", &options()).await.unwrap();
    assert_eq!(result.source, Source::Fallback);
    assert_eq!(result.fallback_reason, Some(FallbackReason::NoResults));
    assert!(!result.products.is_empty());
}

#[tokio::test]
async fn exhausted_chain_is_reported_empty_and_not_cached() {
    let f = fixture(Behaviour::Fail, Behaviour::Products(vec![]));

    let result = f.orchestrator.search_products("fone", &options()).await.unwrap();
    assert!(result.products.is_empty());
    assert_eq!(result.source, Source::Fallback);
    assert_eq!(result.strategy, "none");
    assert_eq!(result.fallback_reason, Some(FallbackReason::UpstreamFailed));
    assert!(f.store.is_empty().unwrap());
}

#[tokio::test]
async fn different_options_use_different_entries() {
    let f = fixture(live_products(), fallback_products());
    f.orchestrator.search_products("fone", &options()).await.unwrap();
    f.orchestrator
        .search_products("fone", &SearchOptions { page: 2, ..options() })
        .await
        .unwrap();
    assert_eq!(f.live.calls(), 2);
    assert_eq!(f.store.len().unwrap(), 2);
}

// ---------------------------------------------------------------------------
// cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelled_search_caches_nothing() {
    let f = fixture(Behaviour::Hang, fallback_products());

    let err = f
        .orchestrator
        .search_products_until(
            "fone",
            &options(),
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AcquisitionError::Cancelled { cause: "caller" }));
    assert!(f.store.is_empty().unwrap());
    assert_eq!(f.fallback.calls(), 0);
}

#[tokio::test]
async fn deadline_bounds_the_whole_call() {
    let f = fixture(Behaviour::Hang, fallback_products());
    let opts = SearchOptions {
        deadline: Some(Duration::from_millis(20)),
        ..options()
    };

    let err = f.orchestrator.search_products("fone", &opts).await.unwrap_err();

    assert!(matches!(err, AcquisitionError::Cancelled { cause: "deadline" }));
    assert!(f.store.is_empty().unwrap());
}

// ---------------------------------------------------------------------------
// details and links
// ---------------------------------------------------------------------------

#[tokio::test]
async fn details_are_cached_and_retagged() {
    let f = fixture(live_products(), fallback_products());

    let first = f
        .orchestrator
        .get_product_details(Platform::Shopee, "1_10")
        .await
        .unwrap();
    assert_eq!(first.source, Source::Live);
    assert_eq!(first.stock, Some(3));

    let second = f
        .orchestrator
        .get_product_details(Platform::Shopee, " 1_10 ")
        .await
        .unwrap();
    assert_eq!(second.source, Source::Cache);
    assert_eq!(f.live.calls(), 1);
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let f = fixture(live_products(), fallback_products());

    let err = f
        .orchestrator
        .get_product_details(Platform::Shopee, "1_99")
        .await
        .unwrap_err();
    assert!(
        matches!(err, AcquisitionError::NotFound(ref r) if r.external_id == "1_99"),
        "got: {err:?}"
    );

    let err = f
        .orchestrator
        .get_product_details(Platform::Shopee, "not-an-id")
        .await
        .unwrap_err();
    assert!(matches!(err, AcquisitionError::InvalidRequest(_)));
    assert_eq!(f.live.calls(), 1);
}

#[tokio::test]
async fn affiliate_link_for_resolved_product() {
    let f = fixture(live_products(), fallback_products());

    let link = f
        .orchestrator
        .generate_affiliate_link(&ProductRef::new(Platform::Shopee, "1_11"), "summer")
        .await
        .unwrap();

    assert_eq!(link.product_ref, ProductRef::new(Platform::Shopee, "1_11"));
    assert!(link.url.starts_with("https://shopee.com.br/product/1/11?af_id=aff1"));
    assert!(link.url.contains(&format!("clickid={}", link.tracking_id)));
}

#[tokio::test]
async fn bad_campaign_is_rejected_without_lookup() {
    let f = fixture(live_products(), fallback_products());
    let err = f
        .orchestrator
        .generate_affiliate_link(&ProductRef::new(Platform::Shopee, "1_11"), "no spaces")
        .await
        .unwrap_err();
    assert!(matches!(err, AcquisitionError::InvalidRequest(_)));
    assert_eq!(f.live.calls(), 0);
}
