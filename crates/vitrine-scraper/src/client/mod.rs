//! HTTP plumbing shared by every acquisition strategy.
//!
//! Status handling is uniform: 429 becomes [`StrategyError::RateLimited`]
//! (with `Retry-After` when present), any other non-2xx becomes
//! [`StrategyError::UpstreamStatus`], and an undecodable body becomes
//! [`StrategyError::Malformed`] carrying a truncated sample of what arrived.
//! Nothing here retries.

mod origin;

use std::time::Duration;

use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::{ScraperError, StrategyError};
use crate::rate_limit::retry_after_secs;

pub use origin::{extract_host, extract_origin};

/// Characters of a bad payload kept for logs and errors.
const SAMPLE_CHARS: usize = 200;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder with the request timeout and `User-Agent` applied.
pub(crate) fn client_builder(timeout: Duration, user_agent: &str) -> ClientBuilder {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .user_agent(user_agent)
}

/// Builds the stateless `reqwest::Client` used by API strategies.
///
/// # Errors
///
/// Returns [`ScraperError::Http`] if the underlying client cannot be
/// constructed (e.g., invalid TLS config).
pub fn build_http_client(timeout: Duration, user_agent: &str) -> Result<Client, ScraperError> {
    Ok(client_builder(timeout, user_agent).build()?)
}

/// Sends `request`, mapping 429 and other non-2xx statuses to errors.
pub(crate) async fn send_checked(request: RequestBuilder) -> Result<Response, StrategyError> {
    let response = request.send().await?;
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(StrategyError::RateLimited {
            url: response.url().to_string(),
            retry_after_secs: retry_after_secs(response.headers()),
        });
    }

    if !status.is_success() {
        return Err(StrategyError::UpstreamStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }

    Ok(response)
}

/// Reads the body as JSON into `T`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, StrategyError> {
    let body = response.text().await?;
    decode_json(&body, context)
}

pub(crate) fn decode_json<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, StrategyError> {
    serde_json::from_str(body).map_err(|e| {
        let sample = truncate_sample(body);
        tracing::warn!(context, error = %e, sample, "malformed upstream payload");
        StrategyError::Malformed {
            context: format!("{context}: {e}"),
            sample,
        }
    })
}

/// First [`SAMPLE_CHARS`] characters of `body`, cut on a char boundary.
pub(crate) fn truncate_sample(body: &str) -> String {
    match body.char_indices().nth(SAMPLE_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_owned(),
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
