use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use vitrine_core::{Platform, Product, ProductDetail, Source};

use crate::adapter::{DetailStrategy, SearchRequest, SearchStrategy};
use crate::client::{extract_host, read_json, send_checked};
use crate::error::{NormalizeError, StrategyError};
use crate::normalize::{normalize, normalize_batch};
use crate::parse::parse_amazon_items;
use crate::types::{AmazonGetItemsResponse, AmazonItem, AmazonSearchResponse, RawItem};

use super::is_valid_asin;
use super::sigv4::{self, PaapiCredentials};

const SEARCH_ITEMS_PATH: &str = "/paapi5/searchitems";
const GET_ITEMS_PATH: &str = "/paapi5/getitems";
const TARGET_PREFIX: &str = "com.amazon.paapi5.v1.ProductAdvertisingAPIv1";

/// PA-API returns at most ten items per page and ten pages per query.
const MAX_ITEM_COUNT: u32 = 10;
const MAX_ITEM_PAGE: u32 = 10;

const RESOURCES: [&str; 13] = [
    "CustomerReviews.Count",
    "CustomerReviews.StarRating",
    "Images.Primary.Large",
    "Images.Variants.Large",
    "ItemInfo.ByLineInfo",
    "ItemInfo.Classifications",
    "ItemInfo.Features",
    "ItemInfo.Title",
    "Offers.Listings.Availability.MaxOrderQuantity",
    "Offers.Listings.Availability.Message",
    "Offers.Listings.MerchantInfo",
    "Offers.Listings.Price",
    "Offers.Listings.SavingBasis",
];

/// Signed client for the Product Advertising API 5.
#[derive(Debug, Clone)]
pub struct PaapiClient {
    client: Client,
    endpoint: String,
    host: String,
    credentials: PaapiCredentials,
    partner_tag: String,
    marketplace: String,
}

impl PaapiClient {
    /// `endpoint` is the API origin (e.g. `https://webservices.amazon.com.br`);
    /// `marketplace` the storefront host (e.g. `www.amazon.com.br`).
    #[must_use]
    pub fn new(
        client: Client,
        endpoint: &str,
        credentials: PaapiCredentials,
        partner_tag: impl Into<String>,
        marketplace: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.trim_end_matches('/').to_owned();
        Self {
            client,
            host: extract_host(&endpoint),
            endpoint,
            credentials,
            partner_tag: partner_tag.into(),
            marketplace: marketplace.into(),
        }
    }

    /// `SearchItems` for one page of keyword results.
    ///
    /// # Errors
    ///
    /// Signing, transport, status or payload failures.
    pub async fn search_items(&self, request: &SearchRequest) -> Result<Vec<RawItem>, StrategyError> {
        let mut body = json!({
            "Keywords": request.keywords,
            "PartnerTag": self.partner_tag,
            "PartnerType": "Associates",
            "Marketplace": self.marketplace,
            "ItemCount": request.limit.clamp(1, MAX_ITEM_COUNT),
            "ItemPage": request.page.clamp(1, MAX_ITEM_PAGE),
            "Resources": RESOURCES,
        });
        // PA-API takes price bounds in the lowest currency denomination.
        if let Some(min) = request.min_price {
            body["MinPrice"] = json!(min);
        }
        if let Some(max) = request.max_price {
            body["MaxPrice"] = json!(max);
        }

        let response: AmazonSearchResponse =
            self.post("SearchItems", SEARCH_ITEMS_PATH, &body).await?;
        for error in &response.errors {
            tracing::debug!(
                code = error.code.as_deref().unwrap_or("unknown"),
                message = error.message.as_deref().unwrap_or(""),
                "paapi SearchItems reported an error"
            );
        }

        let items = response.search_result.map(|r| r.items).unwrap_or_default();
        Ok(parse_amazon_items(items))
    }

    /// `GetItems` for one ASIN; `Ok(None)` when the item is not returned.
    ///
    /// # Errors
    ///
    /// Signing, transport, status or payload failures.
    pub async fn get_item(&self, asin: &str) -> Result<Option<AmazonItem>, StrategyError> {
        let body = json!({
            "ItemIds": [asin],
            "ItemIdType": "ASIN",
            "PartnerTag": self.partner_tag,
            "PartnerType": "Associates",
            "Marketplace": self.marketplace,
            "Resources": RESOURCES,
        });

        let response: AmazonGetItemsResponse = self.post("GetItems", GET_ITEMS_PATH, &body).await?;
        if let Some(error) = response.errors.first() {
            tracing::debug!(
                asin,
                code = error.code.as_deref().unwrap_or("unknown"),
                "paapi GetItems reported an error"
            );
        }

        Ok(response
            .items_result
            .into_iter()
            .flat_map(|r| r.items)
            .find(|item| item.asin.as_deref() == Some(asin)))
    }

    async fn post<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        body: &Value,
    ) -> Result<T, StrategyError> {
        let target = format!("{TARGET_PREFIX}.{operation}");
        let payload = body.to_string();
        let signature = sigv4::sign_post(
            &self.credentials,
            &self.host,
            path,
            &target,
            &payload,
            Utc::now(),
        )?;

        let request = self
            .client
            .post(format!("{}{path}", self.endpoint))
            .header(CONTENT_ENCODING, sigv4::CONTENT_ENCODING)
            .header(CONTENT_TYPE, sigv4::CONTENT_TYPE)
            .header("x-amz-date", signature.amz_date)
            .header("x-amz-target", &target)
            .header(AUTHORIZATION, signature.authorization)
            .body(payload);

        let response = send_checked(request).await?;
        read_json(response, &format!("paapi {operation}")).await
    }
}

#[derive(Debug, Clone)]
pub struct AmazonPaapiSearch {
    client: PaapiClient,
}

impl AmazonPaapiSearch {
    #[must_use]
    pub fn new(client: PaapiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchStrategy for AmazonPaapiSearch {
    fn name(&self) -> &'static str {
        "amazon_paapi"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, StrategyError> {
        let raws = self.client.search_items(request).await?;
        Ok(normalize_batch(Platform::Amazon, raws, request.fetched_at))
    }
}

#[derive(Debug, Clone)]
pub struct AmazonPaapiDetails {
    client: PaapiClient,
}

impl AmazonPaapiDetails {
    #[must_use]
    pub fn new(client: PaapiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DetailStrategy for AmazonPaapiDetails {
    fn name(&self) -> &'static str {
        "amazon_paapi_get_items"
    }

    async fn details(
        &self,
        external_id: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Option<ProductDetail>, StrategyError> {
        if !is_valid_asin(external_id) {
            return Ok(None);
        }
        match self.client.get_item(external_id).await? {
            Some(item) => Ok(Some(detail_from_item(item, fetched_at)?)),
            None => Ok(None),
        }
    }
}

fn detail_from_item(item: AmazonItem, fetched_at: DateTime<Utc>) -> Result<ProductDetail, NormalizeError> {
    let info = item.item_info.clone().unwrap_or_default();

    let description = info
        .features
        .map(|f| f.display_values)
        .filter(|values| !values.is_empty())
        .map(|values| values.join("\n"));

    let mut specifications = BTreeMap::new();
    let brand = info.by_line_info.and_then(|b| b.brand).and_then(|v| v.display_value);
    let classifications = info.classifications.unwrap_or_default();
    let binding = classifications.binding.and_then(|v| v.display_value);
    let group = classifications.product_group.and_then(|v| v.display_value);
    for (name, value) in [("Marca", brand), ("Formato", binding), ("Grupo", group.clone())] {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            specifications.insert(name.to_owned(), value);
        }
    }

    let stock = item
        .first_listing()
        .and_then(|l| l.availability.as_ref())
        .and_then(|a| a.max_order_quantity);

    let product = normalize(Platform::Amazon, &RawItem::Amazon(item), fetched_at)?;

    Ok(ProductDetail {
        product,
        description,
        specifications,
        categories: group.into_iter().collect(),
        stock,
        shop_location: None,
        source: Source::Live,
    })
}
