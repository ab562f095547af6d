use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::RequestBuilder;
use vitrine_core::{Platform, Product, ProductDetail, Source};

use crate::adapter::{DetailStrategy, SearchRequest, SearchStrategy};
use crate::client::send_checked;
use crate::error::StrategyError;
use crate::html::{capture, card_chunks, image_src, text_content};
use crate::normalize::{normalize, normalize_batch};
use crate::session::{SessionGuard, SessionPool};
use crate::types::{HtmlListing, ListingPrice, RawItem};

use super::{canonical_url, is_valid_asin};

static CARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div\b[^>]*data-component-type\s*=\s*["']s-search-result["'][^>]*>"#)
        .expect("valid regex")
});
static ASIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-asin\s*=\s*["']([A-Z0-9]{10})["']"#).expect("valid regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2\b[^>]*>(.*?)</h2>").expect("valid regex"));
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span class="a-price"[^>]*>\s*<span class="a-offscreen">([^<]+)</span>"#)
        .expect("valid regex")
});
static OFFSCREEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span class="a-offscreen">([^<]+)</span>"#).expect("valid regex")
});
static LIST_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<span class="a-price a-text-price"[^>]*>\s*<span class="a-offscreen">([^<]+)</span>"#,
    )
    .expect("valid regex")
});
static RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[.,]\d)\s+(?:de 5 estrelas|out of 5 stars)").expect("valid regex")
});
static PRODUCT_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)id\s*=\s*["']productTitle["'][^>]*>(.*?)</span>"#).expect("valid regex")
});
static SELLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)id\s*=\s*["']sellerProfileTriggerId["'][^>]*>(.*?)</a>"#)
        .expect("valid regex")
});
static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<span class="a-list-item">(.*?)</span>"#).expect("valid regex")
});
static SPEC_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<tr\b[^>]*>\s*<th\b[^>]*>(.*?)</th>\s*<td\b[^>]*>(.*?)</td>")
        .expect("valid regex")
});
static LINK_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>(.*?)</a>").expect("valid regex"));

/// Markers of Amazon's robot-check page.
const CHALLENGE_MARKERS: [&str; 2] = ["/errors/validateCaptcha", "api-services-support@amazon.com"];

async fn fetch_page(session: &mut SessionGuard, request: RequestBuilder) -> Result<String, StrategyError> {
    let request = request
        .header(ACCEPT, "text/html,application/xhtml+xml")
        .header(ACCEPT_LANGUAGE, "pt-BR,pt;q=0.9,en;q=0.8");

    let body = match send_checked(request).await {
        Ok(response) => response.text().await.map_err(StrategyError::from),
        Err(e) => Err(e),
    };
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            // A 404 says nothing about the session's standing.
            if !matches!(e, StrategyError::UpstreamStatus { status: 404, .. }) {
                session.poison();
            }
            return Err(e);
        }
    };

    if CHALLENGE_MARKERS.iter().any(|m| body.contains(m)) {
        session.poison();
        return Err(StrategyError::UpstreamRejected {
            context: "amazon served a robot check".to_owned(),
            code: 503,
        });
    }
    Ok(body)
}

/// The `/s?k=` search results page.
#[derive(Debug, Clone)]
pub struct AmazonHtmlSearch {
    pool: SessionPool,
    base_url: String,
}

impl AmazonHtmlSearch {
    #[must_use]
    pub fn new(pool: SessionPool, base_url: impl Into<String>) -> Self {
        Self {
            pool,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl SearchStrategy for AmazonHtmlSearch {
    fn name(&self) -> &'static str {
        "amazon_html"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, StrategyError> {
        let mut session = self.pool.acquire().await?;
        let page = request.page.to_string();
        let fetch = session
            .client()
            .get(format!("{}/s", self.base_url))
            .query(&[("k", request.keywords.as_str()), ("page", page.as_str())]);
        let body = fetch_page(&mut session, fetch).await?;

        let listings = extract_search_listings(&body);
        Ok(normalize_batch(
            Platform::Amazon,
            listings.into_iter().map(RawItem::Html),
            request.fetched_at,
        ))
    }
}

pub(crate) fn extract_search_listings(html: &str) -> Vec<HtmlListing> {
    let mut seen = HashSet::new();
    card_chunks(html, &CARD_RE)
        .into_iter()
        .filter_map(search_card_listing)
        .filter(|listing| {
            listing
                .external_id
                .as_ref()
                .is_some_and(|id| seen.insert(id.clone()))
        })
        .collect()
}

fn search_card_listing(card: &str) -> Option<HtmlListing> {
    let asin = capture(&ASIN_RE, card)?;

    Some(HtmlListing {
        external_id: Some(asin.to_owned()),
        name: capture(&TITLE_RE, card).map(text_content),
        price: capture(&PRICE_RE, card).map(formatted_price),
        original_price: capture(&LIST_PRICE_RE, card).map(formatted_price),
        image: image_src(card, "s-image"),
        url: Some(canonical_url(asin)),
        rating: capture(&RATING_RE, card).and_then(parse_rating),
        sold_count: None,
        seller_name: None,
    })
}

/// The `/dp/{asin}` product page.
#[derive(Debug, Clone)]
pub struct AmazonProductPage {
    pool: SessionPool,
    base_url: String,
}

impl AmazonProductPage {
    #[must_use]
    pub fn new(pool: SessionPool, base_url: impl Into<String>) -> Self {
        Self {
            pool,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl DetailStrategy for AmazonProductPage {
    fn name(&self) -> &'static str {
        "amazon_product_page"
    }

    async fn details(
        &self,
        external_id: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Option<ProductDetail>, StrategyError> {
        if !is_valid_asin(external_id) {
            return Ok(None);
        }

        let mut session = self.pool.acquire().await?;
        let fetch = session
            .client()
            .get(format!("{}/dp/{external_id}", self.base_url));
        let body = match fetch_page(&mut session, fetch).await {
            Ok(body) => body,
            Err(StrategyError::UpstreamStatus { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        Ok(Some(parse_product_page(&body, external_id, fetched_at)?))
    }
}

pub(crate) fn parse_product_page(
    html: &str,
    asin: &str,
    fetched_at: DateTime<Utc>,
) -> Result<ProductDetail, StrategyError> {
    // Prices outside the buy box belong to other offers and accessories.
    let price_area = section(html, "corePrice").unwrap_or(html);

    let listing = HtmlListing {
        external_id: Some(asin.to_owned()),
        name: capture(&PRODUCT_TITLE_RE, html).map(text_content),
        price: capture(&OFFSCREEN_RE, price_area).map(formatted_price),
        original_price: capture(&LIST_PRICE_RE, price_area)
            .map(formatted_price),
        image: image_src(html, "landingImage"),
        url: Some(canonical_url(asin)),
        rating: capture(&RATING_RE, html).and_then(parse_rating),
        sold_count: None,
        seller_name: capture(&SELLER_RE, html).map(text_content),
    };
    let product = normalize(Platform::Amazon, &RawItem::Html(listing), fetched_at)?;

    let features: Vec<String> = section(html, "feature-bullets")
        .map(|s| until(s, "</ul>"))
        .map(|s| {
            LIST_ITEM_RE
                .captures_iter(s)
                .map(|c| text_content(&c[1]))
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let specifications: BTreeMap<String, String> = SPEC_ROW_RE
        .captures_iter(html)
        .map(|c| (text_content(&c[1]), text_content(&c[2])))
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .collect();

    let categories: Vec<String> = section(html, "wayfinding-breadcrumbs")
        .map(|s| until(s, "</ul>"))
        .map(|s| {
            LINK_TEXT_RE
                .captures_iter(s)
                .map(|c| text_content(&c[1]))
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(ProductDetail {
        product,
        description: (!features.is_empty()).then(|| features.join("\n")),
        specifications,
        categories,
        stock: None,
        shop_location: None,
        source: Source::Live,
    })
}

fn section<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    html.find(marker).map(|idx| &html[idx..])
}

fn until<'a>(text: &'a str, end: &str) -> &'a str {
    text.find(end).map_or(text, |idx| &text[..idx])
}

fn formatted_price(text: &str) -> ListingPrice {
    ListingPrice::Formatted(text_content(text))
}

fn parse_rating(text: &str) -> Option<f32> {
    text.replace(',', ".").parse().ok()
}
