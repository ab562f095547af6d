//! Best-effort URL shortening for affiliate links.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ShortenError;

#[async_trait]
pub trait UrlShortener: Send + Sync {
    /// Shorten `url`.
    ///
    /// # Errors
    ///
    /// Any [`ShortenError`]; callers fall back to the long URL.
    async fn shorten(&self, url: &str) -> Result<String, ShortenError>;
}

/// Shortener speaking the `POST {"url"}` → `{"short_url"}` protocol.
#[derive(Debug, Clone)]
pub struct HttpShortener {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct ShortenRequest<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ShortenResponse {
    short_url: Option<String>,
}

impl HttpShortener {
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl UrlShortener for HttpShortener {
    async fn shorten(&self, url: &str) -> Result<String, ShortenError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ShortenRequest { url })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ShortenError::Status(response.status().as_u16()));
        }

        let body: ShortenResponse = response.json().await?;
        body.short_url
            .map(|s| s.trim().to_owned())
            .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
            .ok_or(ShortenError::MissingShortUrl)
    }
}
