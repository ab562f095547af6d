//! Intermediate shapes between raw upstream payloads and [`vitrine_core::Product`].
//!
//! Every field an upstream may omit is optional here; required-ness is
//! enforced by [`crate::normalize`], which rejects the item instead of
//! guessing.

use serde::{Deserialize, Serialize};
use vitrine_core::FallbackItem;

// ---------------------------------------------------------------------------
// Shopee
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopeeItemRating {
    pub rating_star: Option<f32>,
}

/// The `item_basic` object of Shopee search results. Recommendation and
/// flash-sale feeds return the same fields at the top level of each item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShopeeItemBasic {
    pub itemid: Option<u64>,
    pub shopid: Option<u64>,
    pub name: Option<String>,
    /// Scaled by 100 000 per real.
    pub price: Option<i64>,
    pub price_before_discount: Option<i64>,
    /// Percentage; some endpoints send it negative.
    pub raw_discount: Option<i64>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub historical_sold: Option<u64>,
    pub item_rating: Option<ShopeeItemRating>,
    pub shop_name: Option<String>,
    pub shop_location: Option<String>,
    pub shop_rating: Option<f32>,
    pub stock: Option<u64>,
}

/// One entry of `search_items`: `{"item_basic": {...}}`.
#[derive(Debug, Deserialize)]
pub struct ShopeeSearchEntry {
    pub item_basic: Option<ShopeeItemBasic>,
}

#[derive(Debug, Deserialize)]
pub struct ShopeeSearchResponse {
    #[serde(default)]
    pub error: Option<i64>,
    #[serde(default)]
    pub items: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ShopeeRecommendResponse {
    #[serde(default)]
    pub error: Option<i64>,
    pub data: Option<ShopeeRecommendData>,
}

#[derive(Debug, Deserialize)]
pub struct ShopeeRecommendData {
    #[serde(default)]
    pub sections: Vec<ShopeeRecommendSection>,
}

#[derive(Debug, Deserialize)]
pub struct ShopeeRecommendSection {
    pub data: Option<ShopeeRecommendSectionData>,
}

#[derive(Debug, Deserialize)]
pub struct ShopeeRecommendSectionData {
    #[serde(default)]
    pub item: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ShopeeFlashSaleResponse {
    #[serde(default)]
    pub error: Option<i64>,
    pub data: Option<ShopeeFlashSaleData>,
}

#[derive(Debug, Deserialize)]
pub struct ShopeeFlashSaleData {
    #[serde(default)]
    pub items: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopeeAttribute {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopeeCategory {
    pub display_name: Option<String>,
}

/// `item/get` payload: the basic fields plus detail-only ones.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopeeItemDetail {
    #[serde(flatten)]
    pub basic: ShopeeItemBasic,
    pub description: Option<String>,
    pub attributes: Option<Vec<ShopeeAttribute>>,
    pub categories: Option<Vec<ShopeeCategory>>,
}

#[derive(Debug, Deserialize)]
pub struct ShopeeItemGetResponse {
    #[serde(default)]
    pub error: Option<i64>,
    pub data: Option<ShopeeItemDetail>,
}

// ---------------------------------------------------------------------------
// Amazon Product Advertising API 5
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonDisplayValue {
    pub display_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonDisplayValues {
    #[serde(default)]
    pub display_values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonByLineInfo {
    pub brand: Option<AmazonDisplayValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonClassifications {
    pub binding: Option<AmazonDisplayValue>,
    pub product_group: Option<AmazonDisplayValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonItemInfo {
    pub title: Option<AmazonDisplayValue>,
    pub features: Option<AmazonDisplayValues>,
    pub by_line_info: Option<AmazonByLineInfo>,
    pub classifications: Option<AmazonClassifications>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonPrice {
    pub amount: Option<serde_json::Number>,
    pub currency: Option<String>,
    pub display_amount: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonSavings {
    pub percentage: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonMerchantInfo {
    pub name: Option<String>,
    pub feedback_rating: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonAvailability {
    pub message: Option<String>,
    pub max_order_quantity: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonListing {
    pub price: Option<AmazonPrice>,
    pub saving_basis: Option<AmazonPrice>,
    pub savings: Option<AmazonSavings>,
    pub merchant_info: Option<AmazonMerchantInfo>,
    pub availability: Option<AmazonAvailability>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonOffers {
    #[serde(default)]
    pub listings: Vec<AmazonListing>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonImage {
    #[serde(rename = "URL")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonImageSet {
    pub large: Option<AmazonImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonImages {
    pub primary: Option<AmazonImageSet>,
    #[serde(default)]
    pub variants: Vec<AmazonImageSet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonStarRating {
    pub value: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonCustomerReviews {
    pub star_rating: Option<AmazonStarRating>,
    pub count: Option<u64>,
}

/// One item of `SearchItems` / `GetItems`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonItem {
    #[serde(rename = "ASIN")]
    pub asin: Option<String>,
    #[serde(rename = "DetailPageURL")]
    pub detail_page_url: Option<String>,
    pub item_info: Option<AmazonItemInfo>,
    pub offers: Option<AmazonOffers>,
    pub images: Option<AmazonImages>,
    pub customer_reviews: Option<AmazonCustomerReviews>,
}

impl AmazonItem {
    #[must_use]
    pub fn first_listing(&self) -> Option<&AmazonListing> {
        self.offers.as_ref().and_then(|o| o.listings.first())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonApiError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonSearchResult {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonSearchResponse {
    pub search_result: Option<AmazonSearchResult>,
    #[serde(default)]
    pub errors: Vec<AmazonApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonItemsResult {
    #[serde(default)]
    pub items: Vec<AmazonItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmazonGetItemsResponse {
    pub items_result: Option<AmazonItemsResult>,
    #[serde(default)]
    pub errors: Vec<AmazonApiError>,
}

// ---------------------------------------------------------------------------
// HTML listings
// ---------------------------------------------------------------------------

/// How an HTML listing expressed its price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingPrice {
    /// Brazilian display text, e.g. `"R$ 1.234,56"`.
    Formatted(String),
    /// Machine decimal from structured data, e.g. `"1234.56"`.
    Decimal(String),
}

/// A product card extracted from a search results page or JSON-LD block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HtmlListing {
    pub external_id: Option<String>,
    pub name: Option<String>,
    pub price: Option<ListingPrice>,
    pub original_price: Option<ListingPrice>,
    pub image: Option<String>,
    pub url: Option<String>,
    pub rating: Option<f32>,
    pub sold_count: Option<u64>,
    pub seller_name: Option<String>,
}

/// Input to [`crate::normalize::normalize`], one variant per parsed shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    Shopee(ShopeeItemBasic),
    Amazon(AmazonItem),
    Html(HtmlListing),
    Fallback(FallbackItem),
}
