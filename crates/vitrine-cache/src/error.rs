use thiserror::Error;

/// Backend failures. Never escapes [`crate::Cache`]; only logged.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache operation {op} timed out after {timeout_ms}ms")]
    Timeout { op: &'static str, timeout_ms: u64 },

    #[error("cache value for {key} could not be (de)serialized: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}
