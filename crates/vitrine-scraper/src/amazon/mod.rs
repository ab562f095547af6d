//! Amazon Brasil acquisition strategies.
//!
//! Search chain: `amazon_paapi` (only with credentials) → `amazon_html` →
//! `amazon_fallback`. Details: PA-API `GetItems` → the `/dp/{asin}` page →
//! the fallback catalog.

mod html;
mod paapi;
mod sigv4;

pub use html::{AmazonHtmlSearch, AmazonProductPage};
pub use paapi::{AmazonPaapiDetails, AmazonPaapiSearch, PaapiClient};
pub use sigv4::PaapiCredentials;

use crate::normalize::AMAZON_WEB_BASE;

/// ASINs are ten uppercase ASCII letters or digits.
#[must_use]
pub fn is_valid_asin(external_id: &str) -> bool {
    external_id.len() == 10
        && external_id
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

pub(crate) fn canonical_url(asin: &str) -> String {
    format!("{AMAZON_WEB_BASE}/dp/{asin}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asin_shape() {
        assert!(is_valid_asin("B08N5WRWNB"));
        assert!(is_valid_asin("8535914846"));
        assert!(!is_valid_asin("b08n5wrwnb"));
        assert!(!is_valid_asin("B08N5WRWN"));
        assert!(!is_valid_asin("123_456"));
    }
}
