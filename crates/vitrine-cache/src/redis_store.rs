use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::CacheError;
use crate::store::CacheStore;

/// Redis-backed store. Every command is bounded by `op_timeout` so a slow
/// server never stalls a search longer than that.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisStore {
    /// Open a managed connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Redis`] if the URL is invalid or the server
    /// refuses the connection, and [`CacheError::Timeout`] if connecting
    /// takes longer than `op_timeout`.
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = bounded("connect", op_timeout, ConnectionManager::new(client)).await?;
        tracing::info!(timeout_ms = op_timeout.as_millis(), "connected to redis cache");
        Ok(Self { conn, op_timeout })
    }
}

async fn bounded<T, F>(op: &'static str, limit: Duration, fut: F) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, redis::RedisError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(CacheError::from),
        Err(_) => Err(CacheError::Timeout {
            op,
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        bounded("get", self.op_timeout, conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // Redis expiry is whole seconds; round sub-second TTLs up so they still expire.
        let secs = ttl.as_secs().max(1);
        bounded("set", self.op_timeout, conn.set_ex::<_, _, ()>(key, value, secs)).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        bounded("delete", self.op_timeout, conn.del::<_, ()>(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_rejects_malformed_url() {
        let result = RedisStore::connect("not a url", Duration::from_millis(100)).await;
        assert!(matches!(result, Err(CacheError::Redis(_))));
    }

    #[tokio::test]
    async fn bounded_reports_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), redis::RedisError>(())
        };
        let err = bounded("get", Duration::from_millis(10), slow)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::Timeout {
                op: "get",
                timeout_ms: 10
            }
        ));
    }
}
