//! Command handlers. Results go to stdout as pretty JSON; logs go to stderr.

use std::time::Duration;

use anyhow::Context;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use vitrine_acquisition::Orchestrator;
use vitrine_core::{Platform, ProductRef, SearchOptions};

/// Reais with up to two decimals to centavos.
pub(crate) fn reais_to_minor(reais: Decimal) -> anyhow::Result<i64> {
    if reais.is_sign_negative() {
        anyhow::bail!("price {reais} must not be negative");
    }
    if reais.normalize().scale() > 2 {
        anyhow::bail!("price {reais} has more than two decimal places");
    }
    (reais * Decimal::ONE_HUNDRED)
        .to_i64()
        .with_context(|| format!("price {reais} is out of range"))
}

pub(crate) fn search_options(
    platform: &str,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    limit: u32,
    page: u32,
    timeout_secs: Option<u64>,
) -> anyhow::Result<SearchOptions> {
    Ok(SearchOptions {
        platform: platform.parse::<Platform>()?,
        min_price: min_price.map(reais_to_minor).transpose()?,
        max_price: max_price.map(reais_to_minor).transpose()?,
        limit,
        page,
        deadline: timeout_secs.map(Duration::from_secs),
    })
}

pub(crate) async fn run_search(
    orchestrator: &Orchestrator,
    keywords: &str,
    options: &SearchOptions,
) -> anyhow::Result<()> {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let result = orchestrator
        .search_products_until(keywords, options, ctrl_c)
        .await?;
    print_json(&result)
}

pub(crate) async fn run_details(
    orchestrator: &Orchestrator,
    platform: &str,
    external_id: &str,
) -> anyhow::Result<()> {
    let detail = orchestrator
        .get_product_details(platform.parse()?, external_id)
        .await?;
    print_json(&detail)
}

pub(crate) async fn run_link(
    orchestrator: &Orchestrator,
    platform: &str,
    external_id: &str,
    campaign: &str,
) -> anyhow::Result<()> {
    let product = ProductRef::new(platform.parse()?, external_id);
    let link = orchestrator
        .generate_affiliate_link(&product, campaign)
        .await?;
    print_json(&link)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
