//! Product acquisition for the vitrine affiliate dashboard.
//!
//! [`Orchestrator`] is the entry point: keyword search, product details and
//! affiliate link generation, each answered from the cache when possible and
//! from the platform adapters' strategy chains otherwise.

pub mod bootstrap;
pub mod error;
pub mod links;
pub mod orchestrator;
pub mod registry;
pub mod shortener;

pub use bootstrap::build_from_config;
pub use error::{AcquisitionError, BuildError, LinkError, ShortenError};
pub use links::{validate_campaign_id, AffiliateAccounts, LinkGenerator};
pub use orchestrator::{CacheTtls, Orchestrator};
pub use registry::AdapterRegistry;
pub use shortener::{HttpShortener, UrlShortener};
