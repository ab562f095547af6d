use thiserror::Error;
use vitrine_core::Platform;

/// Why a single acquisition strategy produced nothing usable.
///
/// Every variant causes the adapter to move on to the next strategy; none of
/// them is retried within the same call.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {url} (retry after {retry_after_secs:?}s)")]
    RateLimited {
        url: String,
        retry_after_secs: Option<u64>,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("upstream rejected {context} with code {code}")]
    UpstreamRejected { context: String, code: i64 },

    #[error("malformed payload for {context}: {sample}")]
    Malformed { context: String, sample: String },

    #[error("attempt timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("strategy {strategy} requires credentials that are not configured")]
    MissingCredentials { strategy: &'static str },

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("outbound limiter for {platform} is closed")]
    LimiterClosed { platform: Platform },

    #[error("unusable item: {0}")]
    Unusable(#[from] NormalizeError),
}

impl StrategyError {
    /// Short label used as the `outcome` log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_error",
            Self::RateLimited { .. } => "rate_limited",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::UpstreamRejected { .. } => "upstream_rejected",
            Self::Malformed { .. } => "malformed",
            Self::Timeout { .. } => "timeout",
            Self::MissingCredentials { .. } => "missing_credentials",
            Self::Signing(_) => "signing_failed",
            Self::LimiterClosed { .. } => "limiter_closed",
            Self::Unusable(_) => "unusable_item",
        }
    }
}

/// Adapter-level failures, after the whole chain has been consulted.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP client construction failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("every acquisition strategy for {platform} was exhausted")]
    UpstreamUnavailable { platform: Platform },

    #[error("{platform} product {external_id} not found")]
    NotFound {
        platform: Platform,
        external_id: String,
    },

    #[error("invalid {platform} product id \"{external_id}\": {reason}")]
    InvalidExternalId {
        platform: Platform,
        external_id: String,
        reason: String,
    },
}

/// A raw item that could not be mapped to a `Product`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("{platform} item is missing required field {field}")]
    MissingField {
        platform: Platform,
        field: &'static str,
    },

    #[error("{platform} item {external_id} has an unusable price {raw:?}")]
    InvalidPrice {
        platform: Platform,
        external_id: String,
        raw: String,
    },
}
