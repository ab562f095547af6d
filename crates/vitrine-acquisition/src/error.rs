use thiserror::Error;
use vitrine_core::{ConfigError, Platform, ProductRef};

/// Failures that cross the acquisition boundary.
///
/// Upstream and cache faults never appear here; they degrade the `source`
/// of a result instead.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("product {0} not found")]
    NotFound(ProductRef),

    #[error("acquisition cancelled ({cause})")]
    Cancelled { cause: &'static str },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("campaign id {0:?} must be 1-64 characters of [A-Za-z0-9_-]")]
    InvalidCampaignId(String),

    #[error("product url {url:?} is not an absolute http(s) url")]
    InvalidProductUrl { url: String },

    #[error("no affiliate program is configured for {0}")]
    UnsupportedPlatform(Platform),
}

impl From<LinkError> for AcquisitionError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::UnsupportedPlatform(platform) => {
                Self::Configuration(ConfigError::UnsupportedPlatform(platform))
            }
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}

/// Why a shortening attempt produced no short URL. Never surfaced to
/// callers; the link keeps its long form.
#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("shortener answered with status {0}")]
    Status(u16),

    #[error("shortener response had no usable short_url")]
    MissingShortUrl,
}

/// Failures while assembling an [`crate::Orchestrator`] from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scraper(#[from] vitrine_scraper::ScraperError),
}
