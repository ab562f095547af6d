//! Platform adapters: ordered fallback chains of acquisition strategies.
//!
//! A [`PlatformAdapter`] holds its strategies as data, in priority order, and
//! walks them sequentially. The first strategy that yields at least one
//! product wins; an empty answer or any [`StrategyError`] moves on to the next
//! one. No strategy runs twice in a call, and two never run at once.
//!
//! Live strategies hold a permit from the platform's [`PlatformLimiter`] and
//! are bounded by the attempt timeout. Fallback strategies serve static data
//! and skip both.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vitrine_core::{FallbackReason, Platform, Product, ProductDetail, SearchOptions, Source};

use crate::error::{ScraperError, StrategyError};
use crate::rate_limit::PlatformLimiter;

/// Whether a strategy talks to the upstream or serves static data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Live,
    Fallback,
}

impl Tier {
    #[must_use]
    pub fn source(self) -> Source {
        match self {
            Tier::Live => Source::Live,
            Tier::Fallback => Source::Fallback,
        }
    }
}

/// One search as seen by strategies. Prices are minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub keywords: String,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub limit: u32,
    /// 1-based.
    pub page: u32,
    /// Stamped on every product normalized for this request.
    pub fetched_at: DateTime<Utc>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(keywords: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self::from_options(keywords, &SearchOptions::default(), fetched_at)
    }

    #[must_use]
    pub fn from_options(
        keywords: impl Into<String>,
        options: &SearchOptions,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            keywords: keywords.into(),
            min_price: options.min_price,
            max_price: options.max_price,
            limit: options.limit,
            page: options.page,
            fetched_at,
        }
    }

    /// Zero-based index of the first item on `page`.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    #[must_use]
    pub fn accepts_price(&self, price: i64) -> bool {
        self.min_price.is_none_or(|min| price >= min) && self.max_price.is_none_or(|max| price <= max)
    }
}

#[async_trait]
pub trait SearchStrategy: Send + Sync {
    /// Stable name used in logs and in `SearchResult::strategy`.
    fn name(&self) -> &'static str;

    fn tier(&self) -> Tier {
        Tier::Live
    }

    /// Products for `request`, already normalized. `Ok(vec![])` means the
    /// upstream answered but had nothing usable.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Product>, StrategyError>;
}

#[async_trait]
pub trait DetailStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn tier(&self) -> Tier {
        Tier::Live
    }

    /// `Ok(None)` means the upstream positively reported the product missing.
    /// The adapter overwrites `source` on the returned detail.
    async fn details(
        &self,
        external_id: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Option<ProductDetail>, StrategyError>;
}

/// What a search chain produced and where it came from.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub products: Vec<Product>,
    pub strategy: &'static str,
    pub tier: Tier,
    /// Set when `tier` is [`Tier::Fallback`].
    pub fallback_reason: Option<FallbackReason>,
}

pub struct PlatformAdapter {
    platform: Platform,
    search_chain: Vec<Box<dyn SearchStrategy>>,
    detail_chain: Vec<Box<dyn DetailStrategy>>,
    limiter: PlatformLimiter,
    attempt_timeout: Duration,
}

impl std::fmt::Debug for PlatformAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformAdapter")
            .field("platform", &self.platform)
            .field("search_chain", &self.search_strategy_names())
            .field("detail_chain", &self.detail_strategy_names())
            .field("attempt_timeout", &self.attempt_timeout)
            .finish_non_exhaustive()
    }
}

impl PlatformAdapter {
    #[must_use]
    pub fn new(platform: Platform, limiter: PlatformLimiter, attempt_timeout: Duration) -> Self {
        Self {
            platform,
            search_chain: Vec::new(),
            detail_chain: Vec::new(),
            limiter,
            attempt_timeout,
        }
    }

    /// Append a search strategy at the lowest priority so far.
    #[must_use]
    pub fn with_search_strategy(mut self, strategy: impl SearchStrategy + 'static) -> Self {
        self.search_chain.push(Box::new(strategy));
        self
    }

    /// Append a detail strategy at the lowest priority so far.
    #[must_use]
    pub fn with_detail_strategy(mut self, strategy: impl DetailStrategy + 'static) -> Self {
        self.detail_chain.push(Box::new(strategy));
        self
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn search_strategy_names(&self) -> Vec<&'static str> {
        self.search_chain.iter().map(|s| s.name()).collect()
    }

    #[must_use]
    pub fn detail_strategy_names(&self) -> Vec<&'static str> {
        self.detail_chain.iter().map(|s| s.name()).collect()
    }

    /// Walk the search chain until a strategy yields products.
    ///
    /// Live results are filtered by the request's price bounds and truncated
    /// to `limit`; fallback results are returned verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::UpstreamUnavailable`] when every strategy,
    /// fallback included, came back empty or failed.
    pub async fn search(&self, request: &SearchRequest) -> Result<ChainOutcome, ScraperError> {
        let mut live_failed = false;

        for strategy in &self.search_chain {
            let name = strategy.name();
            let tier = strategy.tier();
            let started = Instant::now();
            let result = self.attempt(tier, strategy.search(request)).await;
            let elapsed_ms = elapsed_ms(started);

            let products = match result {
                Ok(products) => products,
                Err(e) => {
                    if tier == Tier::Live {
                        live_failed = true;
                    }
                    tracing::warn!(
                        platform = %self.platform,
                        strategy = name,
                        outcome = e.kind(),
                        elapsed_ms,
                        error = %e,
                        "strategy failed"
                    );
                    continue;
                }
            };

            let products = match tier {
                Tier::Live => refine_live(products, request),
                Tier::Fallback => products,
            };

            if products.is_empty() {
                tracing::info!(
                    platform = %self.platform,
                    strategy = name,
                    outcome = "empty",
                    elapsed_ms,
                    "strategy returned no products"
                );
                continue;
            }

            tracing::info!(
                platform = %self.platform,
                strategy = name,
                outcome = "success",
                elapsed_ms,
                count = products.len(),
                "strategy succeeded"
            );

            let fallback_reason = (tier == Tier::Fallback).then_some(if live_failed {
                FallbackReason::UpstreamFailed
            } else {
                FallbackReason::NoResults
            });

            return Ok(ChainOutcome {
                products,
                strategy: name,
                tier,
                fallback_reason,
            });
        }

        tracing::error!(platform = %self.platform, "search chain exhausted");
        Err(ScraperError::UpstreamUnavailable {
            platform: self.platform,
        })
    }

    /// Walk the detail chain.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::NotFound`] when a strategy reports the product
    /// missing, or when every strategy failed.
    pub async fn details(
        &self,
        external_id: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<ProductDetail, ScraperError> {
        for strategy in &self.detail_chain {
            let name = strategy.name();
            let tier = strategy.tier();
            let started = Instant::now();
            let result = self
                .attempt(tier, strategy.details(external_id, fetched_at))
                .await;
            let elapsed_ms = elapsed_ms(started);

            match result {
                Ok(Some(mut detail)) => {
                    detail.source = tier.source();
                    tracing::info!(
                        platform = %self.platform,
                        strategy = name,
                        outcome = "success",
                        elapsed_ms,
                        external_id,
                        "detail strategy succeeded"
                    );
                    return Ok(detail);
                }
                Ok(None) => {
                    tracing::info!(
                        platform = %self.platform,
                        strategy = name,
                        outcome = "not_found",
                        elapsed_ms,
                        external_id,
                        "product not found"
                    );
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        platform = %self.platform,
                        strategy = name,
                        outcome = e.kind(),
                        elapsed_ms,
                        external_id,
                        error = %e,
                        "detail strategy failed"
                    );
                }
            }
        }

        Err(ScraperError::NotFound {
            platform: self.platform,
            external_id: external_id.to_owned(),
        })
    }

    async fn attempt<T, F>(&self, tier: Tier, fut: F) -> Result<T, StrategyError>
    where
        F: Future<Output = Result<T, StrategyError>>,
    {
        if tier == Tier::Fallback {
            return fut.await;
        }

        let _permit = self.limiter.acquire().await?;
        match tokio::time::timeout(self.attempt_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StrategyError::Timeout {
                timeout_ms: u64::try_from(self.attempt_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

fn refine_live(products: Vec<Product>, request: &SearchRequest) -> Vec<Product> {
    let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
    products
        .into_iter()
        .filter(|p| request.accepts_price(p.price))
        .take(limit)
        .collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "adapter_test.rs"]
mod tests;
