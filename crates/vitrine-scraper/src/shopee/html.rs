use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use vitrine_core::{Platform, Product};

use crate::adapter::{SearchRequest, SearchStrategy};
use crate::client::send_checked;
use crate::error::StrategyError;
use crate::html::{
    absolutize_url, capture, card_chunks, image_src, jsonld_listing, jsonld_products, jsonld_url,
    text_content,
};
use crate::normalize::normalize_batch;
use crate::session::SessionPool;
use crate::types::{HtmlListing, ListingPrice, RawItem};

use super::{canonical_url, ids_from_url};

static CARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-sqe\s*=\s*["']item["']"#).expect("valid regex"));
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)data-sqe\s*=\s*["']name["'][^>]*>(.*?)</div>"#).expect("valid regex")
});
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)data-sqe\s*=\s*["']price["'][^>]*>(.*?)</div>"#).expect("valid regex")
});
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*\shref\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});
static SOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d.,]*)\s*(mil)?\s*vendidos?").expect("valid regex")
});

/// Markers of Shopee's traffic-verification interstitial.
const CHALLENGE_MARKERS: [&str; 3] = ["/verify/traffic", "/verify/captcha", "captcha-container"];

/// Search results page fetched through a pooled browser session.
#[derive(Debug, Clone)]
pub struct ShopeeHtmlSearch {
    pool: SessionPool,
    base_url: String,
}

impl ShopeeHtmlSearch {
    #[must_use]
    pub fn new(pool: SessionPool, base_url: impl Into<String>) -> Self {
        Self {
            pool,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl SearchStrategy for ShopeeHtmlSearch {
    fn name(&self) -> &'static str {
        "shopee_html"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, StrategyError> {
        let mut session = self.pool.acquire().await?;

        // The storefront numbers result pages from zero.
        let page = request.page.saturating_sub(1).to_string();
        let fetch = session
            .client()
            .get(format!("{}/search", self.base_url))
            .query(&[("keyword", request.keywords.as_str()), ("page", page.as_str())])
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, "pt-BR,pt;q=0.9,en;q=0.8");

        let body = match send_checked(fetch).await {
            Ok(response) => response.text().await,
            Err(e) => {
                session.poison();
                return Err(e);
            }
        };
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                session.poison();
                return Err(e.into());
            }
        };

        if CHALLENGE_MARKERS.iter().any(|m| body.contains(m)) {
            session.poison();
            return Err(StrategyError::UpstreamRejected {
                context: "shopee search page served a traffic verification challenge".to_owned(),
                code: 403,
            });
        }

        let listings = extract_listings(&body, &self.base_url);
        if listings.is_empty() {
            tracing::debug!(bytes = body.len(), "shopee search page had no recognizable listings");
        }
        Ok(normalize_batch(
            Platform::Shopee,
            listings.into_iter().map(RawItem::Html),
            request.fetched_at,
        ))
    }
}

/// Listing cards first, then JSON-LD products not already seen.
pub(crate) fn extract_listings(html: &str, base_url: &str) -> Vec<HtmlListing> {
    let mut seen = HashSet::new();
    let mut listings = Vec::new();

    for card in card_chunks(html, &CARD_RE) {
        if let Some(listing) = card_listing(card, base_url) {
            if let Some(id) = &listing.external_id {
                if seen.insert(id.clone()) {
                    listings.push(listing);
                }
            }
        }
    }

    for product in jsonld_products(html) {
        let Some((shopid, itemid)) = jsonld_url(&product).and_then(ids_from_url) else {
            continue;
        };
        let external_id = format!("{shopid}_{itemid}");
        if seen.insert(external_id.clone()) {
            listings.push(jsonld_listing(
                &product,
                external_id,
                canonical_url(shopid, itemid),
            ));
        }
    }

    listings
}

fn card_listing(card: &str, base_url: &str) -> Option<HtmlListing> {
    let href = capture(&HREF_RE, card)?;
    let (shopid, itemid) = ids_from_url(href)?;

    let image = image_src(card, "").and_then(|src| absolutize_url(base_url, &src));

    Some(HtmlListing {
        external_id: Some(format!("{shopid}_{itemid}")),
        name: capture(&NAME_RE, card).map(text_content),
        price: capture(&PRICE_RE, card)
            .map(text_content)
            .filter(|p| !p.is_empty())
            .map(ListingPrice::Formatted),
        original_price: None,
        image,
        url: Some(canonical_url(shopid, itemid)),
        rating: None,
        sold_count: SOLD_RE
            .captures(&text_content(card))
            .and_then(|c| parse_sold(&c[1], c.get(2).is_some())),
        seller_name: None,
    })
}

/// `"1,2"` with the `mil` suffix is 1200; `"1.234"` without it is 1234.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn parse_sold(number: &str, thousands: bool) -> Option<u64> {
    let normalized = number.replace('.', "").replace(',', ".");
    let value: f64 = normalized.parse().ok()?;
    let value = if thousands { value * 1000.0 } else { value };
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <html><body>
        <ul class="shopee-search-item-result__items">
          <li class="shopee-search-item-result__item" data-sqe="item">
            <a data-sqe="link" href="/Fone-de-Ouvido-Bluetooth-i12-TWS-i.123456789.987654321?sp_atk=abc">
              <img src="https://cf.shopee.com.br/file/br-11134207-7r98o-abc" alt="Fone">
              <div data-sqe="name"><div class="line-clamp-2">Fone de Ouvido Bluetooth i12 TWS</div></div>
              <div data-sqe="price"><span>R$</span><span>35,90</span></div>
              <div class="sold">1,2mil vendidos</div>
            </a>
          </li>
          <li class="shopee-search-item-result__item" data-sqe="item">
            <a href="/Caixa-de-Som-i.111.222">
              <div data-sqe="name">Caixa de Som &amp; Rádio</div>
              <div data-sqe="price">R$ 79,90 - R$ 99,90</div>
              <div>87 vendidos</div>
            </a>
          </li>
          <li data-sqe="item"><a href="/ad-banner">Anúncio</a></li>
        </ul>
        <script type="application/ld+json">
          {"@type":"ItemList","itemListElement":[
            {"@type":"ListItem","item":{"@type":"Product","name":"Fone duplicado",
              "url":"https://shopee.com.br/product/123456789/987654321","offers":{"price":"1.00"}}},
            {"@type":"ListItem","item":{"@type":"Product","name":"Smartwatch D20",
              "url":"https://shopee.com.br/Smartwatch-i.5.6","offers":{"price":"49.90"}}}
          ]}
        </script>
        </body></html>
    "#;

    #[test]
    fn extracts_cards_then_unseen_jsonld_products() {
        let listings = extract_listings(SEARCH_PAGE, "https://shopee.com.br");
        let ids: Vec<_> = listings
            .iter()
            .filter_map(|l| l.external_id.as_deref())
            .collect();
        assert_eq!(ids, ["123456789_987654321", "111_222", "5_6"]);

        let fone = &listings[0];
        assert_eq!(fone.name.as_deref(), Some("Fone de Ouvido Bluetooth i12 TWS"));
        assert_eq!(fone.price, Some(ListingPrice::Formatted("R$ 35,90".to_owned())));
        assert_eq!(
            fone.url.as_deref(),
            Some("https://shopee.com.br/product/123456789/987654321")
        );
        assert_eq!(
            fone.image.as_deref(),
            Some("https://cf.shopee.com.br/file/br-11134207-7r98o-abc")
        );
        assert_eq!(fone.sold_count, Some(1200));

        let caixa = &listings[1];
        assert_eq!(caixa.name.as_deref(), Some("Caixa de Som & Rádio"));
        assert_eq!(caixa.sold_count, Some(87));

        assert_eq!(listings[2].price, Some(ListingPrice::Decimal("49.90".to_owned())));
    }

    #[test]
    fn unrecognized_markup_yields_nothing() {
        assert!(extract_listings("<html><div class=\"new-layout\"></div></html>", "https://shopee.com.br").is_empty());
    }

    #[test]
    fn sold_counts_understand_thousands_suffix() {
        assert_eq!(parse_sold("1,2", true), Some(1200));
        assert_eq!(parse_sold("10", true), Some(10_000));
        assert_eq!(parse_sold("1.234", false), Some(1234));
        assert_eq!(parse_sold("87", false), Some(87));
    }
}
