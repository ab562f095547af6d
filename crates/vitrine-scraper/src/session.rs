//! Pooled, cookie-holding HTTP sessions for HTML scraping strategies.
//!
//! A [`BrowserSession`] is a client with its own cookie jar that has visited
//! the storefront home page once, so later search-page requests carry the
//! cookies a real browser would. Sessions are expensive to warm and are
//! reused through a bounded [`SessionPool`].
//!
//! Access is scoped: [`SessionPool::acquire`] hands out a [`SessionGuard`]
//! that puts the session back on drop, on every exit path. A guard marked
//! with [`SessionGuard::poison`] discards its session instead.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use vitrine_core::Platform;

use crate::client::{client_builder, send_checked};
use crate::error::StrategyError;

#[derive(Debug, Clone)]
pub struct BrowserSession {
    id: u64,
    client: Client,
}

impl BrowserSession {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[derive(Debug)]
struct PoolInner {
    platform: Platform,
    home_url: String,
    user_agent: String,
    timeout: Duration,
    idle: Mutex<Vec<BrowserSession>>,
    permits: Arc<Semaphore>,
    next_id: AtomicU64,
    discarded: AtomicU64,
}

/// Bounded pool of warmed sessions for one storefront.
///
/// At most `size` sessions are checked out at once; callers beyond that wait.
#[derive(Debug, Clone)]
pub struct SessionPool {
    inner: Arc<PoolInner>,
}

impl SessionPool {
    #[must_use]
    pub fn new(
        platform: Platform,
        home_url: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
        size: usize,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                platform,
                home_url: home_url.into(),
                user_agent: user_agent.into(),
                timeout,
                idle: Mutex::new(Vec::new()),
                permits: Arc::new(Semaphore::new(size.max(1))),
                next_id: AtomicU64::new(1),
                discarded: AtomicU64::new(0),
            }),
        }
    }

    /// Check out a session, warming a new one when none is idle.
    ///
    /// # Errors
    ///
    /// Returns the warm-up request's [`StrategyError`] if a new session cannot
    /// reach the home page, or [`StrategyError::LimiterClosed`] if the pool
    /// was shut down.
    pub async fn acquire(&self) -> Result<SessionGuard, StrategyError> {
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| StrategyError::LimiterClosed {
                platform: self.inner.platform,
            })?;

        let reused = self.lock_idle().and_then(|mut idle| idle.pop());
        let session = match reused {
            Some(session) => {
                tracing::debug!(platform = %self.inner.platform, session_id = session.id, "reusing browser session");
                session
            }
            None => self.warm_new_session().await?,
        };

        Ok(SessionGuard {
            session,
            pool: Arc::clone(&self.inner),
            poisoned: false,
            _permit: permit,
        })
    }

    /// Sessions waiting in the pool.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.lock_idle().map_or(0, |idle| idle.len())
    }

    /// Sessions ever created.
    #[must_use]
    pub fn created_count(&self) -> u64 {
        self.inner.next_id.load(Ordering::SeqCst) - 1
    }

    /// Sessions dropped after poisoning or a failed warm-up.
    #[must_use]
    pub fn discarded_count(&self) -> u64 {
        self.inner.discarded.load(Ordering::SeqCst)
    }

    async fn warm_new_session(&self) -> Result<BrowserSession, StrategyError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let client = client_builder(self.inner.timeout, &self.inner.user_agent)
            .cookie_store(true)
            .build()?;

        let request = client
            .get(&self.inner.home_url)
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .header(reqwest::header::ACCEPT_LANGUAGE, "pt-BR,pt;q=0.9,en;q=0.8");
        if let Err(e) = send_checked(request).await {
            tracing::warn!(platform = %self.inner.platform, session_id = id, error = %e, "browser session warm-up failed");
            self.inner.discarded.fetch_add(1, Ordering::SeqCst);
            return Err(e);
        }

        tracing::debug!(platform = %self.inner.platform, session_id = id, "warmed new browser session");
        Ok(BrowserSession { id, client })
    }

    fn lock_idle(&self) -> Option<std::sync::MutexGuard<'_, Vec<BrowserSession>>> {
        self.inner.idle.lock().ok()
    }
}

/// A checked-out session. Returns to the pool on drop unless poisoned.
#[derive(Debug)]
pub struct SessionGuard {
    session: BrowserSession,
    pool: Arc<PoolInner>,
    poisoned: bool,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    /// Mark the session unusable; it is discarded instead of pooled.
    pub fn poison(&mut self) {
        self.poisoned = true;
    }
}

impl Deref for SessionGuard {
    type Target = BrowserSession;

    fn deref(&self) -> &BrowserSession {
        &self.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // Clones share the underlying connection pool and cookie jar.
        let session = self.session.clone();

        if self.poisoned {
            self.pool.discarded.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(platform = %self.pool.platform, session_id = session.id, "discarding poisoned browser session");
            return;
        }

        match self.pool.idle.lock() {
            Ok(mut idle) => idle.push(session),
            Err(_) => {
                self.pool.discarded.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(platform = %self.pool.platform, "session pool lock poisoned; dropping session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn home_server(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(status)
                    .insert_header("Set-Cookie", "SPC_F=abc; Path=/")
                    .set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;
        server
    }

    fn pool(server: &MockServer, size: usize) -> SessionPool {
        SessionPool::new(
            Platform::Shopee,
            format!("{}/", server.uri()),
            "vitrine-test/0.1",
            Duration::from_secs(5),
            size,
        )
    }

    #[tokio::test]
    async fn session_returns_to_pool_on_drop() {
        let server = home_server(200).await;
        let pool = pool(&server, 2);

        let first_id = {
            let guard = pool.acquire().await.unwrap();
            guard.id()
        };
        assert_eq!(pool.idle_count(), 1);

        let guard = pool.acquire().await.unwrap();
        assert_eq!(guard.id(), first_id);
        assert_eq!(pool.created_count(), 1);
    }

    #[tokio::test]
    async fn poisoned_session_is_discarded() {
        let server = home_server(200).await;
        let pool = pool(&server, 1);

        {
            let mut guard = pool.acquire().await.unwrap();
            guard.poison();
        }
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.discarded_count(), 1);

        let guard = pool.acquire().await.unwrap();
        assert_eq!(guard.id(), 2);
    }

    #[tokio::test]
    async fn failed_warm_up_is_an_error_and_releases_the_slot() {
        let server = home_server(503).await;
        let pool = pool(&server, 1);

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, StrategyError::UpstreamStatus { status: 503, .. }));
        assert_eq!(pool.idle_count(), 0);

        // The permit was released, so a second attempt does not hang.
        let second = tokio::time::timeout(Duration::from_secs(2), pool.acquire()).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn pool_bounds_checked_out_sessions() {
        let server = home_server(200).await;
        let pool = pool(&server, 1);

        let held = pool.acquire().await.unwrap();
        let waiting = tokio::time::timeout(Duration::from_millis(100), pool.acquire()).await;
        assert!(waiting.is_err(), "second acquire should wait for the first");
        drop(held);

        let guard = tokio::time::timeout(Duration::from_secs(2), pool.acquire())
            .await
            .expect("acquire after release")
            .unwrap();
        assert_eq!(pool.created_count(), 1);
        drop(guard);
    }
}
