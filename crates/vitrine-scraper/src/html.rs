//! Regex-based extraction helpers shared by the storefront HTML strategies.
//!
//! Pages are treated as text: listing cards are located by a marker
//! attribute, and fields are pulled from each card's slice of markup. JSON-LD
//! `Product` blocks are read as a second source on the same page.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::types::{HtmlListing, ListingPrice};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static IMG_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid regex"));
static JSONLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

/// Slices of `html` starting at each match of `marker` and running to the
/// next one (the last runs to the end of the page).
pub(crate) fn card_chunks<'a>(html: &'a str, marker: &Regex) -> Vec<&'a str> {
    let starts: Vec<usize> = marker.find_iter(html).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(html.len());
            &html[start..end]
        })
        .collect()
}

/// First capture group of `re` in `text`, trimmed.
pub(crate) fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

/// Visible text of a markup fragment: tags dropped, common entities decoded,
/// whitespace collapsed.
pub(crate) fn text_content(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

pub(crate) fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    let pattern = format!(r#"(?is)\s{}\s*=\s*["']([^"']*)["']"#, regex::escape(attr));
    let re = Regex::new(&pattern).ok()?;
    re.captures(tag)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|s| !s.is_empty())
}

/// `src` of the first `<img>` in `fragment` whose tag contains `marker`
/// (any image when `marker` is empty). Lazy-loaded images keep the real URL
/// in `data-src`.
pub(crate) fn image_src(fragment: &str, marker: &str) -> Option<String> {
    IMG_TAG_RE
        .find_iter(fragment)
        .map(|m| m.as_str())
        .filter(|tag| marker.is_empty() || tag.contains(marker))
        .find_map(|tag| {
            extract_attr(tag, "data-src")
                .or_else(|| extract_attr(tag, "src"))
                .filter(|src| !src.starts_with("data:"))
        })
}

/// Resolves a possibly relative link against `base_url`.
pub(crate) fn absolutize_url(base_url: &str, candidate: &str) -> Option<String> {
    let candidate = decode_entities(candidate);
    let base = reqwest::Url::parse(base_url).ok()?;
    base.join(&candidate).ok().map(|u| u.to_string())
}

/// Every schema.org `Product` object in the page's JSON-LD blocks.
///
/// Top-level arrays, `@graph` containers and `ItemList` elements are
/// flattened. Blocks that are not valid JSON are ignored.
pub(crate) fn jsonld_products(html: &str) -> Vec<Value> {
    let mut products = Vec::new();

    for cap in JSONLD_RE.captures_iter(html) {
        let Some(text) = cap.get(1) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        collect_products(value, &mut products);
    }

    products
}

fn collect_products(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_products(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_products(graph, out);
            }
            if let Some(elements) = map.remove("itemListElement") {
                collect_products(elements, out);
            }
            // ListItem wraps the product in `item`.
            if let Some(item) = map.remove("item") {
                collect_products(item, out);
            }
            let value = Value::Object(map);
            if has_type(&value, "Product") {
                out.push(value);
            }
        }
        _ => {}
    }
}

fn has_type(item: &Value, wanted: &str) -> bool {
    match item.get("@type") {
        Some(Value::String(s)) => s.eq_ignore_ascii_case(wanted),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.eq_ignore_ascii_case(wanted)),
        _ => false,
    }
}

/// Maps a JSON-LD `Product` to a listing. `url` is the already-canonical
/// product URL and `external_id` the identity parsed from it by the caller.
pub(crate) fn jsonld_listing(item: &Value, external_id: String, url: String) -> HtmlListing {
    let offer = match item.get("offers") {
        Some(Value::Array(offers)) => offers.first(),
        other => other,
    };
    let price = offer
        .and_then(|o| o.get("price").or_else(|| o.get("lowPrice")))
        .and_then(json_price);
    let original_price = offer.and_then(|o| o.get("highPrice")).and_then(json_price);

    let image = match item.get("image") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(images)) => images.iter().find_map(|i| i.as_str().map(str::to_owned)),
        Some(Value::Object(obj)) => obj.get("url").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    };

    let rating = item
        .get("aggregateRating")
        .and_then(|r| r.get("ratingValue"))
        .and_then(json_f32);

    let seller_name = offer
        .and_then(|o| o.get("seller"))
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    HtmlListing {
        external_id: Some(external_id),
        name: item.get("name").and_then(Value::as_str).map(decode_entities),
        price,
        original_price,
        image,
        url: Some(url),
        rating,
        sold_count: None,
        seller_name,
    }
}

/// `url` of a JSON-LD item, falling back to its first offer's `url`.
pub(crate) fn jsonld_url(item: &Value) -> Option<&str> {
    item.get("url").and_then(Value::as_str).or_else(|| {
        let offer = match item.get("offers") {
            Some(Value::Array(offers)) => offers.first(),
            other => other,
        };
        offer.and_then(|o| o.get("url")).and_then(Value::as_str)
    })
}

fn json_price(value: &Value) -> Option<ListingPrice> {
    match value {
        Value::Number(n) => Some(ListingPrice::Decimal(n.to_string())),
        Value::String(s) if s.contains(',') => Some(ListingPrice::Formatted(s.clone())),
        Value::String(s) if !s.trim().is_empty() => Some(ListingPrice::Decimal(s.trim().to_owned())),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn json_f32(value: &Value) -> Option<f32> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.replace(',', ".").parse().ok()))
        .map(|v| v as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_content_strips_tags_and_entities() {
        assert_eq!(
            text_content("<div> Fone <b>Bluetooth</b>&nbsp;&amp; Mic\n</div>"),
            "Fone Bluetooth & Mic"
        );
    }

    #[test]
    fn card_chunks_split_on_marker() {
        let marker = Regex::new(r#"data-sqe="item""#).unwrap();
        let html = r#"<ul><li data-sqe="item">a</li><li data-sqe="item">b</li></ul>"#;
        let chunks = card_chunks(html, &marker);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains(">a<"));
        assert!(!chunks[0].contains(">b<"));
        assert!(chunks[1].ends_with("</ul>"));
    }

    #[test]
    fn image_src_prefers_lazy_source_and_skips_placeholders() {
        let html = r#"<img src="data:image/gif;base64,xx"><img class="s-image" data-src="https://img/1.jpg" src="data:x">"#;
        assert_eq!(image_src(html, "").as_deref(), Some("https://img/1.jpg"));
        assert_eq!(image_src(html, "s-image").as_deref(), Some("https://img/1.jpg"));
        assert_eq!(image_src(html, "missing"), None);
    }

    #[test]
    fn absolutize_resolves_relative_links() {
        assert_eq!(
            absolutize_url("https://shopee.com.br", "/Fone-i.1.2?sp_atk=x&amp;y=1").as_deref(),
            Some("https://shopee.com.br/Fone-i.1.2?sp_atk=x&y=1")
        );
    }

    #[test]
    fn jsonld_products_flattens_graph_and_item_lists() {
        let html = r#"
            <script type="application/ld+json">
            {"@context":"https://schema.org","@graph":[
              {"@type":"WebSite","name":"Loja"},
              {"@type":"ItemList","itemListElement":[
                {"@type":"ListItem","position":1,"item":{"@type":"Product","name":"A","url":"https://x/a"}},
                {"@type":"ListItem","position":2,"item":{"@type":["Product","Thing"],"name":"B"}}
              ]}
            ]}
            </script>
            <script type="application/ld+json">not json</script>
            <script type="application/ld+json">[{"@type":"Product","name":"C"}]</script>
        "#;
        let names: Vec<_> = jsonld_products(html)
            .iter()
            .filter_map(|p| p.get("name").and_then(Value::as_str).map(str::to_owned))
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[test]
    fn jsonld_listing_reads_offer_fields() {
        let item: Value = serde_json::from_str(
            r#"{"@type":"Product","name":"Fone &amp; Case","image":["https://img/a.jpg"],
                "offers":{"@type":"AggregateOffer","lowPrice":"29.90","highPrice":59.9,
                          "seller":{"name":"Loja Oficial"}},
                "aggregateRating":{"ratingValue":"4,8"}}"#,
        )
        .unwrap();
        let listing = jsonld_listing(&item, "1_2".to_owned(), "https://x/product/1/2".to_owned());
        assert_eq!(listing.name.as_deref(), Some("Fone & Case"));
        assert_eq!(listing.price, Some(ListingPrice::Decimal("29.90".to_owned())));
        assert_eq!(listing.original_price, Some(ListingPrice::Decimal("59.9".to_owned())));
        assert_eq!(listing.image.as_deref(), Some("https://img/a.jpg"));
        assert_eq!(listing.rating, Some(4.8));
        assert_eq!(listing.seller_name.as_deref(), Some("Loja Oficial"));
    }
}
