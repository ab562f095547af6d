//! Shopee Brasil acquisition strategies.
//!
//! Chain order: `shopee_search_api` → `shopee_recommend` →
//! `shopee_flash_sale` → `shopee_html` → `shopee_fallback`.

mod api;
mod html;

pub use api::{ShopeeApi, ShopeeFlashSale, ShopeeItemApi, ShopeeRecommend, ShopeeSearchApi};
pub use html::ShopeeHtmlSearch;

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::SHOPEE_WEB_BASE;

static PRODUCT_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/product/(\d+)/(\d+)").expect("valid regex"));
static SLUG_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-i\.(\d+)\.(\d+)").expect("valid regex"));

/// Splits a Shopee `external_id` (`{shopid}_{itemid}`) into its numeric parts.
#[must_use]
pub fn parse_external_id(external_id: &str) -> Option<(u64, u64)> {
    let (shop, item) = external_id.split_once('_')?;
    Some((shop.parse().ok()?, item.parse().ok()?))
}

/// `(shopid, itemid)` from a product link, either the canonical
/// `/product/{shop}/{item}` form or a slug ending in `-i.{shop}.{item}`.
pub(crate) fn ids_from_url(url: &str) -> Option<(u64, u64)> {
    let caps = PRODUCT_PATH_RE
        .captures(url)
        .or_else(|| SLUG_ID_RE.captures(url))?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Public product page, independent of the host the data was fetched from.
pub(crate) fn canonical_url(shopid: u64, itemid: u64) -> String {
    format!("{SHOPEE_WEB_BASE}/product/{shopid}/{itemid}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_id_round_trips_through_parts() {
        assert_eq!(parse_external_id("123456789_987654321"), Some((123_456_789, 987_654_321)));
        assert_eq!(parse_external_id("123456789"), None);
        assert_eq!(parse_external_id("abc_1"), None);
        assert_eq!(parse_external_id("1_"), None);
    }

    #[test]
    fn ids_from_slug_and_product_links() {
        assert_eq!(
            ids_from_url("/Fone-de-Ouvido-Bluetooth-i.123.456?sp_atk=abc"),
            Some((123, 456))
        );
        assert_eq!(
            ids_from_url("https://shopee.com.br/product/123/456"),
            Some((123, 456))
        );
        assert_eq!(ids_from_url("https://shopee.com.br/search?keyword=fone"), None);
    }
}
