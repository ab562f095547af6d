//! Static last-known-good products served when every live strategy fails.
//!
//! A built-in catalog ships with the binary; deployments can replace it with
//! a YAML file (`VITRINE_FALLBACK_CATALOG_PATH`) of the same shape:
//!
//! ```yaml
//! shopee:
//!   - external_id: "123456789_987654321"
//!     name: "Fone de Ouvido Bluetooth i12 TWS"
//!     price: 3590
//!     url: "https://shopee.com.br/product/123456789/987654321"
//! amazon:
//!   - external_id: "B08N5WRWNB"
//!     ...
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::products::Platform;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackItem {
    pub external_id: String,
    pub name: String,
    /// Minor units.
    pub price: i64,
    #[serde(default)]
    pub original_price: Option<i64>,
    #[serde(default)]
    pub discount_percent: Option<u8>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub sold_count: Option<u64>,
    #[serde(default)]
    pub rating: Option<f32>,
    pub url: String,
    #[serde(default)]
    pub seller_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackCatalog {
    pub shopee: Vec<FallbackItem>,
    pub amazon: Vec<FallbackItem>,
}

impl FallbackCatalog {
    /// Items for `platform`; empty for platforms without an adapter.
    #[must_use]
    pub fn items(&self, platform: Platform) -> &[FallbackItem] {
        match platform {
            Platform::Shopee => &self.shopee,
            Platform::Amazon => &self.amazon,
            Platform::MercadoLivre => &[],
        }
    }

    #[must_use]
    pub fn find(&self, platform: Platform, external_id: &str) -> Option<&FallbackItem> {
        self.items(platform)
            .iter()
            .find(|item| item.external_id == external_id)
    }
}

/// Load and validate a fallback catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_fallback_catalog(path: &Path) -> Result<FallbackCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_fallback_catalog(&content)
}

/// Parse and validate a fallback catalog from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_fallback_catalog(yaml: &str) -> Result<FallbackCatalog, ConfigError> {
    let catalog: FallbackCatalog =
        serde_yaml::from_str(yaml).map_err(ConfigError::CatalogFileParse)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &FallbackCatalog) -> Result<(), ConfigError> {
    for platform in [Platform::Shopee, Platform::Amazon] {
        let items = catalog.items(platform);
        if items.is_empty() {
            return Err(ConfigError::Validation(format!(
                "fallback catalog for {platform} must contain at least one item"
            )));
        }

        let mut seen_ids = HashSet::new();
        for item in items {
            if item.external_id.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{platform} fallback item '{}' has an empty external_id",
                    item.name
                )));
            }
            if item.url.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{platform} fallback item '{}' has an empty url",
                    item.external_id
                )));
            }
            if item.price <= 0 {
                return Err(ConfigError::Validation(format!(
                    "{platform} fallback item '{}' has non-positive price {}",
                    item.external_id, item.price
                )));
            }
            if !seen_ids.insert(item.external_id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate {platform} fallback item id: '{}'",
                    item.external_id
                )));
            }
        }
    }

    Ok(())
}

fn shopee_item(
    shop_id: &str,
    item_id: &str,
    name: &str,
    price: i64,
    discount_percent: u8,
    image_id: &str,
    sold_count: u64,
) -> FallbackItem {
    FallbackItem {
        external_id: format!("{shop_id}_{item_id}"),
        name: name.to_owned(),
        price,
        original_price: None,
        discount_percent: Some(discount_percent),
        image: Some(format!("https://cf.shopee.com.br/file/{image_id}")),
        sold_count: Some(sold_count),
        rating: None,
        url: format!("https://shopee.com.br/product/{shop_id}/{item_id}"),
        seller_name: None,
    }
}

fn amazon_item(asin: &str, name: &str, price: i64, image_id: &str, rating: f32) -> FallbackItem {
    FallbackItem {
        external_id: asin.to_owned(),
        name: name.to_owned(),
        price,
        original_price: None,
        discount_percent: None,
        image: Some(format!("https://m.media-amazon.com/images/I/{image_id}.jpg")),
        sold_count: None,
        rating: Some(rating),
        url: format!("https://www.amazon.com.br/dp/{asin}"),
        seller_name: Some("Amazon.com.br".to_owned()),
    }
}

/// The catalog compiled into the binary.
#[must_use]
pub fn builtin_fallback_catalog() -> FallbackCatalog {
    FallbackCatalog {
        shopee: vec![
            shopee_item(
                "123456789",
                "987654321",
                "Fone de Ouvido Bluetooth i12 TWS Touch Original",
                3590,
                75,
                "br-11134207-7qukw-lkgiam5tpq7v1e",
                50_000,
            ),
            shopee_item(
                "234567890",
                "876543210",
                "Relógio Smartwatch D20 Y68 Monitor Cardíaco",
                2990,
                80,
                "sg-11134201-22110-5kiam7tpq8jv2a",
                100_000,
            ),
            shopee_item(
                "345678901",
                "765432109",
                "Kit 10 Máscaras Descartáveis KN95 Proteção 5 Camadas",
                1990,
                60,
                "br-11134207-7qukw-lfi8h5tpq9kv3b",
                30_000,
            ),
            shopee_item(
                "456789012",
                "654321098",
                "Carregador Turbo 20W USB-C iPhone Samsung Xiaomi",
                2590,
                70,
                "br-11134207-7r98o-lkgiam8uqq8v4c",
                40_000,
            ),
            shopee_item(
                "567890123",
                "543210987",
                "Caixa de Som Bluetooth JBL Charge Mini Portátil",
                8990,
                50,
                "sg-11134201-22100-qgqxd89d7aiv29",
                25_000,
            ),
        ],
        amazon: vec![
            amazon_item(
                "B08N5WRWNB",
                "Echo Dot (4ª Geração) Smart Speaker com Alexa",
                29_990,
                "71JB6hM6Z6L._AC_SL1000_",
                4.8,
            ),
            amazon_item(
                "B09SWTG9GF",
                "Kindle 11ª Geração com iluminação embutida",
                49_900,
                "71lrGdhmQDL._AC_SL1000_",
                4.7,
            ),
            amazon_item(
                "B08C1W5N87",
                "Fire TV Stick com Controle Remoto por Voz com Alexa",
                37_905,
                "51CgKGfMelL._AC_SL1000_",
                4.8,
            ),
        ],
    }
}
