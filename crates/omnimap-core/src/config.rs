use crate::aggregate::DedupPolicy;
use crate::app_config::{AppConfig, Environment};
use crate::types::SessionCheckPolicy;
use crate::ConfigError;

/// Continuation tokens are rejected by the places provider when redeemed
/// sooner than this after they were issued.
pub const MIN_PAGE_DELAY_MS: u64 = 2000;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
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
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can feed a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    // Present-but-blank counts as missing: an empty key would only fail
    // later, on the first provider call.
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let places_api_key = require("OMNIMAP_PLACES_API_KEY")?;
    let gateway_url = require("OMNIMAP_GATEWAY_URL")?;

    let env = parse_environment(&or_default("OMNIMAP_ENV", "development"))?;

    let bind_addr = or_default("OMNIMAP_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("OMNIMAP_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("OMNIMAP_LOG_LEVEL", "info");
    let places_base_url = or_default(
        "OMNIMAP_PLACES_BASE_URL",
        "https://maps.googleapis.com/maps/api/place/",
    );
    let database_url = lookup("DATABASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty());
    let db_max_connections = parse_u32("OMNIMAP_DB_MAX_CONNECTIONS", "5")?;

    let request_timeout_secs = parse_u64("OMNIMAP_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("OMNIMAP_USER_AGENT", "omnimap/0.1 (lead-search)");

    let page_delay_ms = parse_u64("OMNIMAP_PAGE_DELAY_MS", "2000")?;
    if page_delay_ms < MIN_PAGE_DELAY_MS {
        return Err(invalid(
            "OMNIMAP_PAGE_DELAY_MS",
            format!("must be at least {MIN_PAGE_DELAY_MS}ms, got {page_delay_ms}ms"),
        ));
    }

    let max_retries = parse_u32("OMNIMAP_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("OMNIMAP_RETRY_BACKOFF_BASE_SECS", "1")?;
    let dedup_policy = parse_dedup_policy(&or_default("OMNIMAP_DEDUP_POLICY", "keep-all"))?;
    let session_check = parse_session_check(&or_default("OMNIMAP_SESSION_CHECK", "warn"))?;
    let auth_wait_secs = parse_u64("OMNIMAP_AUTH_WAIT_SECS", "120")?;
    let session_idle_secs = parse_u64("OMNIMAP_SESSION_IDLE_SECS", "1800")?;
    if session_idle_secs == 0 {
        return Err(invalid("OMNIMAP_SESSION_IDLE_SECS", "must be greater than zero".to_owned()));
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        places_api_key,
        places_base_url,
        gateway_url,
        database_url,
        db_max_connections,
        request_timeout_secs,
        user_agent,
        page_delay_ms,
        max_retries,
        retry_backoff_base_secs,
        dedup_policy,
        session_check,
        auth_wait_secs,
        session_idle_secs,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "OMNIMAP_ENV".to_string(),
            reason: format!("expected development|test|production, got {other:?}"),
        }),
    }
}

fn parse_dedup_policy(s: &str) -> Result<DedupPolicy, ConfigError> {
    match s {
        "keep-all" => Ok(DedupPolicy::KeepAll),
        "by-place-id" => Ok(DedupPolicy::ByPlaceId),
        other => Err(ConfigError::InvalidEnvVar {
            var: "OMNIMAP_DEDUP_POLICY".to_string(),
            reason: format!("expected keep-all|by-place-id, got {other:?}"),
        }),
    }
}

fn parse_session_check(s: &str) -> Result<SessionCheckPolicy, ConfigError> {
    match s {
        "warn" => Ok(SessionCheckPolicy::Warn),
        "block" => Ok(SessionCheckPolicy::Block),
        other => Err(ConfigError::InvalidEnvVar {
            var: "OMNIMAP_SESSION_CHECK".to_string(),
            reason: format!("expected warn|block, got {other:?}"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
