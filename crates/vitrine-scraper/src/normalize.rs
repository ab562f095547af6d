//! Normalization from parsed upstream shapes ([`RawItem`]) to [`Product`].
//!
//! Every function here is pure: the fetch timestamp comes from the caller, so
//! normalizing the same input twice yields identical products.

use chrono::{DateTime, Utc};
use vitrine_core::{derive_discount_percent, FallbackItem, Platform, Product};

use crate::error::NormalizeError;
use crate::price::{json_number_to_minor, parse_brl, parse_decimal, shopee_scaled_to_minor};
use crate::types::{AmazonItem, HtmlListing, ListingPrice, RawItem, ShopeeItemBasic};

pub(crate) const SHOPEE_WEB_BASE: &str = "https://shopee.com.br";
pub(crate) const SHOPEE_IMAGE_BASE: &str = "https://cf.shopee.com.br/file";
pub(crate) const AMAZON_WEB_BASE: &str = "https://www.amazon.com.br";

const CURRENCY_BRL: &str = "BRL";

/// Map one parsed item to a canonical [`Product`].
///
/// `platform` is recorded on the product as-is; the variant of `raw` picks
/// the mapping rules.
///
/// # Errors
///
/// Returns [`NormalizeError::MissingField`] when the identity, URL, name or
/// price is absent, and [`NormalizeError::InvalidPrice`] when the price cannot
/// be converted to minor units.
pub fn normalize(
    platform: Platform,
    raw: &RawItem,
    fetched_at: DateTime<Utc>,
) -> Result<Product, NormalizeError> {
    match raw {
        RawItem::Shopee(item) => normalize_shopee(platform, item, fetched_at),
        RawItem::Amazon(item) => normalize_amazon(platform, item, fetched_at),
        RawItem::Html(listing) => normalize_listing(platform, listing, fetched_at),
        RawItem::Fallback(item) => normalize_fallback(platform, item, fetched_at),
    }
}

/// Normalize a batch, skipping (and logging) items that fail.
#[must_use]
pub fn normalize_batch<I>(platform: Platform, raws: I, fetched_at: DateTime<Utc>) -> Vec<Product>
where
    I: IntoIterator<Item = RawItem>,
{
    raws.into_iter()
        .filter_map(|raw| match normalize(platform, &raw, fetched_at) {
            Ok(product) => Some(product),
            Err(e) => {
                tracing::warn!(%platform, error = %e, "skipping item that failed normalization");
                None
            }
        })
        .collect()
}

fn normalize_shopee(
    platform: Platform,
    item: &ShopeeItemBasic,
    fetched_at: DateTime<Utc>,
) -> Result<Product, NormalizeError> {
    let itemid = item.itemid.ok_or(NormalizeError::MissingField {
        platform,
        field: "itemid",
    })?;
    let shopid = item.shopid.ok_or(NormalizeError::MissingField {
        platform,
        field: "shopid",
    })?;
    let external_id = format!("{shopid}_{itemid}");
    let name = required_text(item.name.as_deref(), platform, "name")?;

    let raw_price = item.price.ok_or(NormalizeError::MissingField {
        platform,
        field: "price",
    })?;
    let price = shopee_scaled_to_minor(raw_price).ok_or_else(|| NormalizeError::InvalidPrice {
        platform,
        external_id: external_id.clone(),
        raw: raw_price.to_string(),
    })?;

    let original_price = item
        .price_before_discount
        .and_then(shopee_scaled_to_minor)
        .filter(|original| *original > price);

    let discount_percent = item
        .raw_discount
        .map(i64::abs)
        .and_then(|d| u8::try_from(d).ok())
        .filter(|d| (1..=99).contains(d))
        .or_else(|| original_price.and_then(|o| derive_discount_percent(price, o)));

    let mut images: Vec<String> = item
        .images
        .iter()
        .flatten()
        .filter(|id| !id.is_empty())
        .map(|id| shopee_image_url(id))
        .collect();
    let primary_image = item
        .image
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(shopee_image_url);
    if let Some(primary) = &primary_image {
        if !images.contains(primary) {
            images.insert(0, primary.clone());
        }
    }

    Ok(Product {
        platform,
        external_id,
        name,
        price,
        currency: CURRENCY_BRL.to_owned(),
        original_price,
        discount_percent,
        primary_image: primary_image.or_else(|| images.first().cloned()),
        images,
        rating: item
            .item_rating
            .as_ref()
            .and_then(|r| r.rating_star)
            .and_then(clamp_rating),
        sold_count: item.historical_sold.unwrap_or(0),
        url: format!("{SHOPEE_WEB_BASE}/product/{shopid}/{itemid}"),
        seller_name: non_empty(item.shop_name.as_deref()),
        seller_rating: item.shop_rating.and_then(clamp_rating),
        fetched_at,
    })
}

fn normalize_amazon(
    platform: Platform,
    item: &AmazonItem,
    fetched_at: DateTime<Utc>,
) -> Result<Product, NormalizeError> {
    let external_id = required_text(item.asin.as_deref(), platform, "ASIN")?;
    let detail_url = required_text(item.detail_page_url.as_deref(), platform, "DetailPageURL")?;
    let name = required_text(
        item.item_info
            .as_ref()
            .and_then(|i| i.title.as_ref())
            .and_then(|t| t.display_value.as_deref()),
        platform,
        "ItemInfo.Title",
    )?;

    let listing = item.first_listing();
    let offer_price = listing
        .and_then(|l| l.price.as_ref())
        .ok_or(NormalizeError::MissingField {
            platform,
            field: "Offers.Listings.Price",
        })?;
    let price = offer_price
        .amount
        .as_ref()
        .and_then(json_number_to_minor)
        .or_else(|| offer_price.display_amount.as_deref().and_then(parse_brl))
        .ok_or_else(|| NormalizeError::InvalidPrice {
            platform,
            external_id: external_id.clone(),
            raw: format!("{offer_price:?}"),
        })?;

    let original_price = listing
        .and_then(|l| l.saving_basis.as_ref())
        .and_then(|basis| basis.amount.as_ref())
        .and_then(json_number_to_minor)
        .filter(|original| *original > price);

    let discount_percent = listing
        .and_then(|l| l.savings.as_ref())
        .and_then(|s| s.percentage)
        .filter(|d| (1..=99).contains(d))
        .or_else(|| original_price.and_then(|o| derive_discount_percent(price, o)));

    let images: Vec<String> = item
        .images
        .iter()
        .flat_map(|set| set.primary.iter().chain(set.variants.iter()))
        .filter_map(|img| img.large.as_ref().and_then(|l| l.url.clone()))
        .collect();

    let merchant = listing.and_then(|l| l.merchant_info.as_ref());

    Ok(Product {
        platform,
        external_id,
        name,
        price,
        currency: offer_price
            .currency
            .clone()
            .unwrap_or_else(|| CURRENCY_BRL.to_owned()),
        original_price,
        discount_percent,
        primary_image: images.first().cloned(),
        images,
        rating: item
            .customer_reviews
            .as_ref()
            .and_then(|r| r.star_rating.as_ref())
            .and_then(|s| s.value)
            .and_then(clamp_rating),
        sold_count: 0,
        url: strip_query(&detail_url),
        seller_name: merchant.and_then(|m| non_empty(m.name.as_deref())),
        seller_rating: merchant.and_then(|m| m.feedback_rating).and_then(clamp_rating),
        fetched_at,
    })
}

fn normalize_listing(
    platform: Platform,
    listing: &HtmlListing,
    fetched_at: DateTime<Utc>,
) -> Result<Product, NormalizeError> {
    let external_id = required_text(listing.external_id.as_deref(), platform, "external_id")?;
    let url = required_text(listing.url.as_deref(), platform, "url")?;
    let name = required_text(listing.name.as_deref(), platform, "name")?;

    let listed = listing.price.as_ref().ok_or(NormalizeError::MissingField {
        platform,
        field: "price",
    })?;
    let price = listing_price_to_minor(listed).ok_or_else(|| NormalizeError::InvalidPrice {
        platform,
        external_id: external_id.clone(),
        raw: format!("{listed:?}"),
    })?;
    let original_price = listing
        .original_price
        .as_ref()
        .and_then(listing_price_to_minor)
        .filter(|original| *original > price);

    let images: Vec<String> = listing.image.iter().cloned().collect();

    Ok(Product {
        platform,
        external_id,
        name,
        price,
        currency: CURRENCY_BRL.to_owned(),
        original_price,
        discount_percent: original_price.and_then(|o| derive_discount_percent(price, o)),
        primary_image: images.first().cloned(),
        images,
        rating: listing.rating.and_then(clamp_rating),
        sold_count: listing.sold_count.unwrap_or(0),
        url,
        seller_name: non_empty(listing.seller_name.as_deref()),
        seller_rating: None,
        fetched_at,
    })
}

fn normalize_fallback(
    platform: Platform,
    item: &FallbackItem,
    fetched_at: DateTime<Utc>,
) -> Result<Product, NormalizeError> {
    let external_id = required_text(Some(item.external_id.as_str()), platform, "external_id")?;
    let url = required_text(Some(item.url.as_str()), platform, "url")?;
    let name = required_text(Some(item.name.as_str()), platform, "name")?;
    if item.price <= 0 {
        return Err(NormalizeError::InvalidPrice {
            platform,
            external_id,
            raw: item.price.to_string(),
        });
    }

    let original_price = item.original_price.filter(|o| *o > item.price);
    let images: Vec<String> = item.image.iter().cloned().collect();

    Ok(Product {
        platform,
        external_id,
        name,
        price: item.price,
        currency: CURRENCY_BRL.to_owned(),
        original_price,
        discount_percent: item
            .discount_percent
            .or_else(|| original_price.and_then(|o| derive_discount_percent(item.price, o))),
        primary_image: images.first().cloned(),
        images,
        rating: item.rating.and_then(clamp_rating),
        sold_count: item.sold_count.unwrap_or(0),
        url,
        seller_name: non_empty(item.seller_name.as_deref()),
        seller_rating: None,
        fetched_at,
    })
}

pub(crate) fn shopee_image_url(image_id: &str) -> String {
    if image_id.starts_with("http://") || image_id.starts_with("https://") {
        image_id.to_owned()
    } else {
        format!("{SHOPEE_IMAGE_BASE}/{image_id}")
    }
}

fn listing_price_to_minor(price: &ListingPrice) -> Option<i64> {
    match price {
        ListingPrice::Formatted(text) => parse_brl(text),
        ListingPrice::Decimal(text) => parse_decimal(text),
    }
}

fn required_text(
    value: Option<&str>,
    platform: Platform,
    field: &'static str,
) -> Result<String, NormalizeError> {
    non_empty(value).ok_or(NormalizeError::MissingField { platform, field })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// `None` for NaN; everything else is pinned into `[0, 5]`.
fn clamp_rating(rating: f32) -> Option<f32> {
    rating.is_finite().then(|| rating.clamp(0.0, 5.0))
}

fn strip_query(url: &str) -> String {
    url.split(['?', '#']).next().unwrap_or(url).to_owned()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
