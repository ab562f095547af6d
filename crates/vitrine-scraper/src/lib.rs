pub mod adapter;
pub mod amazon;
pub mod client;
pub mod error;
pub mod fallback;
mod html;
pub mod normalize;
pub mod parse;
pub mod platforms;
pub mod price;
pub mod rate_limit;
pub mod session;
pub mod shopee;
pub mod types;

pub use adapter::{
    ChainOutcome, DetailStrategy, PlatformAdapter, SearchRequest, SearchStrategy, Tier,
};
pub use amazon::is_valid_asin;
pub use client::build_http_client;
pub use error::{NormalizeError, ScraperError, StrategyError};
pub use fallback::{StaticFallbackDetails, StaticFallbackSearch};
pub use normalize::{normalize, normalize_batch};
pub use platforms::{amazon_adapter, shopee_adapter};
pub use rate_limit::PlatformLimiter;
pub use session::{SessionGuard, SessionPool};
pub use shopee::parse_external_id;
pub use types::RawItem;
