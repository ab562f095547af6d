//! Shared domain types and configuration for the vitrine workspace.

pub mod app_config;
pub mod catalog;
pub mod config;
pub mod products;

use thiserror::Error;

pub use app_config::{AffiliateNetwork, AppConfig, Environment};
pub use catalog::{
    builtin_fallback_catalog, load_fallback_catalog, parse_fallback_catalog, FallbackCatalog,
    FallbackItem,
};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use products::{
    derive_discount_percent, AffiliateLink, FallbackReason, IdentityMismatch, Platform, Product,
    ProductDetail, ProductRef, SearchOptions, SearchResult, Source,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("unknown platform \"{0}\"")]
    UnknownPlatform(String),

    #[error("platform {0} has no acquisition adapter")]
    UnsupportedPlatform(Platform),

    #[error("failed to read fallback catalog {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fallback catalog: {0}")]
    CatalogFileParse(#[source] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}
