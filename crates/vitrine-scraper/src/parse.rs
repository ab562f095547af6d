//! Per-platform parse step: untyped JSON entries to typed intermediate items.
//!
//! Each entry is decoded independently so one odd item cannot sink a page.
//! Entries that do not match the expected shape are skipped with a `warn`.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{AmazonItem, RawItem, ShopeeItemBasic, ShopeeSearchEntry};

/// `search_items` entries wrap the item in `item_basic`.
#[must_use]
pub fn parse_shopee_search_entries(entries: Vec<Value>) -> Vec<RawItem> {
    decode_each::<ShopeeSearchEntry>(entries, "shopee search entry")
        .into_iter()
        .filter_map(|entry| match entry.item_basic {
            Some(basic) => Some(RawItem::Shopee(basic)),
            None => {
                tracing::warn!("shopee search entry without item_basic; skipping");
                None
            }
        })
        .collect()
}

/// Recommendation and flash-sale feeds carry the item fields at top level.
#[must_use]
pub fn parse_shopee_feed_items(entries: Vec<Value>) -> Vec<RawItem> {
    decode_each::<ShopeeItemBasic>(entries, "shopee feed item")
        .into_iter()
        .map(RawItem::Shopee)
        .collect()
}

#[must_use]
pub fn parse_amazon_items(entries: Vec<Value>) -> Vec<RawItem> {
    decode_each::<AmazonItem>(entries, "amazon item")
        .into_iter()
        .map(RawItem::Amazon)
        .collect()
}

fn decode_each<T: DeserializeOwned>(entries: Vec<Value>, context: &str) -> Vec<T> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value::<T>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(context, index = idx, error = %e, "skipping entry with unexpected shape");
                None
            }
        })
        .collect()
}
