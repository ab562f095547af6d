use std::collections::HashMap;

use async_trait::async_trait;
use vitrine_core::ProductRef;

use super::*;
use crate::error::ShortenError;

fn product(platform: Platform, external_id: &str, url: &str) -> Product {
    Product {
        platform,
        external_id: external_id.to_owned(),
        name: "Fone Bluetooth TWS".to_owned(),
        price: 8_990,
        currency: "BRL".to_owned(),
        original_price: None,
        discount_percent: None,
        images: vec![],
        primary_image: None,
        rating: None,
        sold_count: 0,
        url: url.to_owned(),
        seller_name: None,
        seller_rating: None,
        fetched_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

fn accounts(network: AffiliateNetwork) -> AffiliateAccounts {
    AffiliateAccounts {
        shopee_affiliate_id: "aff 123".to_owned(),
        shopee_network: network,
        amazon_associate_tag: "vitrine-20".to_owned(),
    }
}

fn query_of(url: &str) -> HashMap<String, String> {
    Url::parse(url).unwrap().query_pairs().into_owned().collect()
}

struct FixedShortener(Result<&'static str, ()>);

#[async_trait]
impl UrlShortener for FixedShortener {
    async fn shorten(&self, _url: &str) -> Result<String, ShortenError> {
        self.0
            .map(str::to_owned)
            .map_err(|()| ShortenError::MissingShortUrl)
    }
}

#[test]
fn campaign_id_shape() {
    assert!(validate_campaign_id("black-friday_2025").is_ok());
    assert!(validate_campaign_id(&"a".repeat(64)).is_ok());
    assert!(validate_campaign_id("").is_err());
    assert!(validate_campaign_id(&"a".repeat(65)).is_err());
    assert!(validate_campaign_id("promo&x=1").is_err());
    assert!(validate_campaign_id("promoção").is_err());
}

#[test]
fn ecomobi_link_keeps_existing_query_and_encodes_values() {
    let generator = LinkGenerator::new(accounts(AffiliateNetwork::Ecomobi));
    let item = product(
        Platform::Shopee,
        "123_456",
        "https://shopee.com.br/product/123/456?sp_atk=abc",
    );

    let (url, network) = generator.tracked_url(&item, "summer", "1-0-deadbeef").unwrap();

    assert_eq!(network, AffiliateNetwork::Ecomobi);
    assert!(url.starts_with("https://shopee.com.br/product/123/456?sp_atk=abc&af_id=aff+123"));
    let query = query_of(&url);
    assert_eq!(query["af_id"], "aff 123");
    assert_eq!(query["af_sub1"], "summer");
    assert_eq!(query["af_sub2"], "vitrine");
    assert_eq!(query["utm_source"], "ecomobi");
    assert_eq!(query["utm_medium"], "affiliate");
    assert_eq!(query["utm_campaign"], "summer");
    assert_eq!(query["clickid"], "1-0-deadbeef");
    assert_eq!(query["sp_atk"], "abc");
}

#[test]
fn admitad_link_wraps_product_url() {
    let generator = LinkGenerator::new(AffiliateAccounts {
        shopee_affiliate_id: "a1b2c3".to_owned(),
        ..accounts(AffiliateNetwork::Admitad)
    });
    let item = product(Platform::Shopee, "1_2", "https://shopee.com.br/product/1/2");

    let (url, network) = generator.tracked_url(&item, "summer", "t-1").unwrap();

    assert_eq!(network, AffiliateNetwork::Admitad);
    assert!(url.starts_with("https://ad.admitad.com/g/a1b2c3/?ulp="));
    let query = query_of(&url);
    assert_eq!(query["ulp"], "https://shopee.com.br/product/1/2");
    assert_eq!(query["subid"], "summer");
    assert_eq!(query["subid1"], "t-1");
}

#[test]
fn amazon_link_carries_tag_and_subtag() {
    let generator = LinkGenerator::new(accounts(AffiliateNetwork::Ecomobi));
    let item = product(
        Platform::Amazon,
        "B08N5WRWNB",
        "https://www.amazon.com.br/dp/B08N5WRWNB",
    );

    let (url, network) = generator.tracked_url(&item, "natal", "t-9").unwrap();

    assert_eq!(network, AffiliateNetwork::AmazonAssociates);
    let query = query_of(&url);
    assert_eq!(query["tag"], "vitrine-20");
    assert_eq!(query["linkCode"], "as2");
    assert_eq!(query["creativeASIN"], "B08N5WRWNB");
    assert_eq!(query["ascsubtag"], "natal_t-9");
}

#[test]
fn unsupported_platform_and_bad_url_are_rejected() {
    let generator = LinkGenerator::new(accounts(AffiliateNetwork::Ecomobi));

    let ml = product(
        Platform::MercadoLivre,
        "MLB1",
        "https://produto.mercadolivre.com.br/MLB1",
    );
    assert_eq!(
        generator.tracked_url(&ml, "c", "t").unwrap_err(),
        LinkError::UnsupportedPlatform(Platform::MercadoLivre)
    );

    let relative = product(Platform::Shopee, "1_2", "/product/1/2");
    assert!(matches!(
        generator.tracked_url(&relative, "c", "t").unwrap_err(),
        LinkError::InvalidProductUrl { .. }
    ));
}

#[tokio::test]
async fn repeated_generation_yields_distinct_tracking_ids() {
    let generator = LinkGenerator::new(accounts(AffiliateNetwork::Ecomobi));
    let item = product(Platform::Shopee, "1_2", "https://shopee.com.br/product/1/2");

    let first = generator.generate(&item, "summer").await.unwrap();
    let second = generator.generate(&item, "summer").await.unwrap();

    assert_ne!(first.tracking_id, second.tracking_id);
    assert_eq!(first.product_ref, second.product_ref);
    assert_eq!(first.product_ref, ProductRef::new(Platform::Shopee, "1_2"));
    assert_eq!(first.campaign_id, second.campaign_id);
    assert_eq!(query_of(&first.url)["clickid"], first.tracking_id);
    assert_eq!(query_of(&second.url)["clickid"], second.tracking_id);
    assert_eq!(first.tracking_id.split('-').count(), 3);
    assert_eq!(first.short_url, None);
}

#[tokio::test]
async fn shortener_result_is_attached_and_failures_are_swallowed() {
    let item = product(Platform::Shopee, "1_2", "https://shopee.com.br/product/1/2");

    let ok = LinkGenerator::new(accounts(AffiliateNetwork::Ecomobi))
        .with_shortener(Arc::new(FixedShortener(Ok("https://s.ee/x"))));
    let link = ok.generate(&item, "summer").await.unwrap();
    assert_eq!(link.short_url.as_deref(), Some("https://s.ee/x"));

    let failing = LinkGenerator::new(accounts(AffiliateNetwork::Ecomobi))
        .with_shortener(Arc::new(FixedShortener(Err(()))));
    let link = failing.generate(&item, "summer").await.unwrap();
    assert_eq!(link.short_url, None);
    assert!(link.url.contains("af_id="));
}

#[tokio::test]
async fn invalid_campaign_fails_before_shortening() {
    let generator = LinkGenerator::new(accounts(AffiliateNetwork::Ecomobi));
    let item = product(Platform::Shopee, "1_2", "https://shopee.com.br/product/1/2");
    let err = generator.generate(&item, "bad campaign").await.unwrap_err();
    assert_eq!(err, LinkError::InvalidCampaignId("bad campaign".to_owned()));
}
