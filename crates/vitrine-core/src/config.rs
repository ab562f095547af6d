use std::path::PathBuf;

use crate::app_config::{AffiliateNetwork, AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `FOO=` in a `.env` file disables a value.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        let value = raw
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("VITRINE_ENV", "development"))?;
    let log_level = or_default("VITRINE_LOG_LEVEL", "info");

    let redis_url = optional("REDIS_URL");
    let cache_op_timeout_ms = parse_u64("VITRINE_CACHE_OP_TIMEOUT_MS", "500")?;
    let live_ttl_secs = parse_u64("VITRINE_LIVE_TTL_SECS", "1800")?;
    let fallback_ttl_secs = parse_u64("VITRINE_FALLBACK_TTL_SECS", "120")?;
    if fallback_ttl_secs > 300 {
        return Err(ConfigError::InvalidEnvVar {
            var: "VITRINE_FALLBACK_TTL_SECS".to_string(),
            reason: "fallback results may be cached for at most 300 seconds".to_string(),
        });
    }
    let detail_ttl_secs = parse_u64("VITRINE_DETAIL_TTL_SECS", "3600")?;

    let request_timeout_secs = parse_u64("VITRINE_REQUEST_TIMEOUT_SECS", "10")?;
    if request_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "VITRINE_REQUEST_TIMEOUT_SECS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let user_agent = or_default("VITRINE_USER_AGENT", DEFAULT_USER_AGENT);
    let max_concurrent_requests = parse_positive_usize("VITRINE_MAX_CONCURRENT_REQUESTS", "4")?;
    let session_pool_size = parse_positive_usize("VITRINE_SESSION_POOL_SIZE", "2")?;

    let shopee_base_url = or_default("VITRINE_SHOPEE_BASE_URL", "https://shopee.com.br");
    let amazon_base_url = or_default("VITRINE_AMAZON_BASE_URL", "https://www.amazon.com.br");
    let amazon_paapi_url = or_default(
        "VITRINE_AMAZON_PAAPI_URL",
        "https://webservices.amazon.com.br",
    );
    let amazon_region = or_default("VITRINE_AMAZON_REGION", "us-east-1");

    let shopee_affiliate_id = or_default("SHOPEE_AFFILIATE_ID", "default");
    let shopee_affiliate_network =
        parse_shopee_network(&or_default("SHOPEE_AFFILIATE_NETWORK", "ecomobi"))?;
    let amazon_associate_tag = or_default("AMAZON_ASSOCIATE_TAG", "affiliate-br-20");
    let amazon_access_key = optional("AMAZON_ACCESS_KEY");
    let amazon_secret_key = optional("AMAZON_SECRET_KEY");

    let shortener_url = optional("VITRINE_SHORTENER_URL");
    let fallback_catalog_path = optional("VITRINE_FALLBACK_CATALOG_PATH").map(PathBuf::from);

    Ok(AppConfig {
        env,
        log_level,
        redis_url,
        cache_op_timeout_ms,
        live_ttl_secs,
        fallback_ttl_secs,
        detail_ttl_secs,
        request_timeout_secs,
        user_agent,
        max_concurrent_requests,
        session_pool_size,
        shopee_base_url,
        amazon_base_url,
        amazon_paapi_url,
        amazon_region,
        shopee_affiliate_id,
        shopee_affiliate_network,
        amazon_associate_tag,
        amazon_access_key,
        amazon_secret_key,
        shortener_url,
        fallback_catalog_path,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "VITRINE_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// Only Shopee has a choice of network; Amazon always uses Associates.
fn parse_shopee_network(s: &str) -> Result<AffiliateNetwork, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "ecomobi" => Ok(AffiliateNetwork::Ecomobi),
        "admitad" => Ok(AffiliateNetwork::Admitad),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SHOPEE_AFFILIATE_NETWORK".to_string(),
            reason: format!("unknown network \"{other}\"; expected ecomobi or admitad"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
