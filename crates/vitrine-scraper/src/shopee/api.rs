use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder};
use vitrine_core::{Platform, Product, ProductDetail, Source};

use crate::adapter::{DetailStrategy, SearchRequest, SearchStrategy};
use crate::client::{extract_origin, read_json, send_checked};
use crate::error::{NormalizeError, StrategyError};
use crate::normalize::{normalize, normalize_batch};
use crate::parse::{parse_shopee_feed_items, parse_shopee_search_entries};
use crate::types::{
    RawItem, ShopeeFlashSaleResponse, ShopeeItemDetail, ShopeeItemGetResponse,
    ShopeeRecommendResponse, ShopeeSearchResponse,
};

use super::{canonical_url, parse_external_id};

/// Thin client for Shopee's public `api/v4` JSON endpoints.
///
/// Requests carry the headers the storefront's own XHRs send; without them
/// the API answers with an error code instead of items.
#[derive(Debug, Clone)]
pub struct ShopeeApi {
    client: Client,
    base_url: String,
}

impl ShopeeApi {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn get(&self, path: &str, referer: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header(REFERER, referer)
            .header(ORIGIN, extract_origin(&self.base_url))
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, "pt-BR,pt;q=0.9,en;q=0.8")
            .header("X-Requested-With", "XMLHttpRequest")
            .header("X-API-SOURCE", "pc")
            .header("X-Shopee-Language", "pt-BR")
    }

    fn search_referer(&self, keywords: &str) -> String {
        let page = format!("{}/search", self.base_url);
        reqwest::Url::parse_with_params(&page, &[("keyword", keywords)])
            .map_or(page, |u| u.to_string())
    }

    /// Keyword search. Price bounds are sent in whole reais, widened so the
    /// upstream never drops an item the caller's bounds would keep.
    ///
    /// # Errors
    ///
    /// Any transport, status or payload failure, or a nonzero `error` code.
    pub async fn search_items(&self, request: &SearchRequest) -> Result<Vec<RawItem>, StrategyError> {
        let mut query: Vec<(&str, String)> = vec![
            ("by", "relevancy".to_owned()),
            ("keyword", request.keywords.clone()),
            ("limit", request.limit.to_string()),
            ("newest", request.offset().to_string()),
            ("order", "desc".to_owned()),
            ("page_type", "search".to_owned()),
            ("scenario", "PAGE_GLOBAL_SEARCH".to_owned()),
            ("version", "2".to_owned()),
        ];
        if let Some(min) = request.min_price {
            query.push(("price_min", (min / 100).to_string()));
        }
        if let Some(max) = request.max_price {
            query.push(("price_max", ((max + 99) / 100).to_string()));
        }

        let referer = self.search_referer(&request.keywords);
        let response =
            send_checked(self.get("/api/v4/search/search_items", &referer).query(&query)).await?;
        let body: ShopeeSearchResponse = read_json(response, "shopee search_items").await?;
        check_error_code(body.error, "shopee search_items")?;

        Ok(parse_shopee_search_entries(body.items.unwrap_or_default()))
    }

    /// Trending items from the category recommendation feed.
    ///
    /// # Errors
    ///
    /// Any transport, status or payload failure, or a nonzero `error` code.
    pub async fn recommend(&self, limit: u32) -> Result<Vec<RawItem>, StrategyError> {
        let query = [
            ("bundle", "shop_page_category_tab_main".to_owned()),
            ("cate_level", "1".to_owned()),
            ("limit", limit.to_string()),
            ("offset", "0".to_owned()),
            ("section", "shop_page_category_tab_main_sec".to_owned()),
            ("tab_name", "popular".to_owned()),
        ];
        let referer = format!("{}/", self.base_url);
        let response =
            send_checked(self.get("/api/v4/recommend/recommend", &referer).query(&query)).await?;
        let body: ShopeeRecommendResponse = read_json(response, "shopee recommend").await?;
        check_error_code(body.error, "shopee recommend")?;

        let items = body
            .data
            .and_then(|d| d.sections.into_iter().next())
            .and_then(|s| s.data)
            .and_then(|d| d.item)
            .unwrap_or_default();
        Ok(parse_shopee_feed_items(items))
    }

    /// Items of the running flash sale.
    ///
    /// # Errors
    ///
    /// Any transport, status or payload failure, or a nonzero `error` code.
    pub async fn flash_sale(&self, limit: u32) -> Result<Vec<RawItem>, StrategyError> {
        let query = [
            ("limit", limit.to_string()),
            ("offset", "0".to_owned()),
            ("need_personalize", "true".to_owned()),
            ("with_dp_items", "true".to_owned()),
        ];
        let referer = format!("{}/flash_sale", self.base_url);
        let response = send_checked(
            self.get("/api/v4/flash_sale/flash_sale_get_items", &referer)
                .query(&query),
        )
        .await?;
        let body: ShopeeFlashSaleResponse = read_json(response, "shopee flash_sale").await?;
        check_error_code(body.error, "shopee flash_sale")?;

        let items = body.data.and_then(|d| d.items).unwrap_or_default();
        Ok(parse_shopee_feed_items(items))
    }

    /// Full item record; `Ok(None)` when Shopee answers without data.
    ///
    /// # Errors
    ///
    /// Any transport, status or payload failure, or a nonzero `error` code.
    pub async fn item_get(
        &self,
        shopid: u64,
        itemid: u64,
    ) -> Result<Option<ShopeeItemDetail>, StrategyError> {
        let query = [("itemid", itemid.to_string()), ("shopid", shopid.to_string())];
        let referer = canonical_url(shopid, itemid);
        let response = send_checked(self.get("/api/v4/item/get", &referer).query(&query)).await?;
        let body: ShopeeItemGetResponse = read_json(response, "shopee item/get").await?;
        check_error_code(body.error, "shopee item/get")?;
        Ok(body.data)
    }
}

fn check_error_code(code: Option<i64>, context: &str) -> Result<(), StrategyError> {
    match code {
        None | Some(0) => Ok(()),
        Some(code) => Err(StrategyError::UpstreamRejected {
            context: context.to_owned(),
            code,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct ShopeeSearchApi {
    api: ShopeeApi,
}

impl ShopeeSearchApi {
    #[must_use]
    pub fn new(api: ShopeeApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SearchStrategy for ShopeeSearchApi {
    fn name(&self) -> &'static str {
        "shopee_search_api"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, StrategyError> {
        let raws = self.api.search_items(request).await?;
        Ok(normalize_batch(Platform::Shopee, raws, request.fetched_at))
    }
}

/// Trending feed. Ignores the keywords; the adapter still applies the
/// caller's price bounds and limit.
#[derive(Debug, Clone)]
pub struct ShopeeRecommend {
    api: ShopeeApi,
}

impl ShopeeRecommend {
    #[must_use]
    pub fn new(api: ShopeeApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SearchStrategy for ShopeeRecommend {
    fn name(&self) -> &'static str {
        "shopee_recommend"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, StrategyError> {
        let raws = self.api.recommend(request.limit).await?;
        Ok(normalize_batch(Platform::Shopee, raws, request.fetched_at))
    }
}

#[derive(Debug, Clone)]
pub struct ShopeeFlashSale {
    api: ShopeeApi,
}

impl ShopeeFlashSale {
    #[must_use]
    pub fn new(api: ShopeeApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SearchStrategy for ShopeeFlashSale {
    fn name(&self) -> &'static str {
        "shopee_flash_sale"
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, StrategyError> {
        let raws = self.api.flash_sale(request.limit).await?;
        Ok(normalize_batch(Platform::Shopee, raws, request.fetched_at))
    }
}

/// Product details through `item/get`.
#[derive(Debug, Clone)]
pub struct ShopeeItemApi {
    api: ShopeeApi,
}

impl ShopeeItemApi {
    #[must_use]
    pub fn new(api: ShopeeApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DetailStrategy for ShopeeItemApi {
    fn name(&self) -> &'static str {
        "shopee_item_api"
    }

    async fn details(
        &self,
        external_id: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Option<ProductDetail>, StrategyError> {
        let Some((shopid, itemid)) = parse_external_id(external_id) else {
            return Ok(None);
        };
        match self.api.item_get(shopid, itemid).await? {
            Some(item) => Ok(Some(detail_from_item(item, fetched_at)?)),
            None => Ok(None),
        }
    }
}

fn detail_from_item(
    item: ShopeeItemDetail,
    fetched_at: DateTime<Utc>,
) -> Result<ProductDetail, NormalizeError> {
    let ShopeeItemDetail {
        basic,
        description,
        attributes,
        categories,
    } = item;

    let stock = basic.stock;
    let shop_location = basic.shop_location.clone().filter(|s| !s.trim().is_empty());
    let product = normalize(Platform::Shopee, &RawItem::Shopee(basic), fetched_at)?;

    let specifications: BTreeMap<String, String> = attributes
        .into_iter()
        .flatten()
        .filter_map(|attr| {
            let name = attr.name?.trim().to_owned();
            let value = attr.value?.trim().to_owned();
            (!name.is_empty() && !value.is_empty()).then_some((name, value))
        })
        .collect();

    let categories = categories
        .into_iter()
        .flatten()
        .filter_map(|c| c.display_name)
        .filter(|name| !name.trim().is_empty())
        .collect();

    Ok(ProductDetail {
        product,
        description: description.filter(|d| !d.trim().is_empty()),
        specifications,
        categories,
        stock,
        shop_location,
        source: Source::Live,
    })
}
