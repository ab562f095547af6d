//! TTL cache used by the acquisition layer.
//!
//! [`Cache`] is the only type callers touch. It serializes values as JSON and
//! swallows every backend failure, so an unreachable Redis degrades to
//! "always miss" instead of failing a search.

pub mod error;
pub mod key;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::CacheError;
pub use key::{normalize_keywords, CacheKey};
pub use memory::{Clock, ManualClock, MemoryStore, SystemClock};
pub use redis_store::RedisStore;
pub use store::{Cache, CacheStore, DisabledStore};
