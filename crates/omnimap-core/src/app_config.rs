use std::net::SocketAddr;

use crate::aggregate::DedupPolicy;
use crate::types::SessionCheckPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub places_api_key: String,
    pub places_base_url: String,
    pub gateway_url: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub page_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub dedup_policy: DedupPolicy,
    pub session_check: SessionCheckPolicy,
    pub auth_wait_secs: u64,
    /// Sessions untouched for this long are closed.
    pub session_idle_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("places_api_key", &"[redacted]")
            .field("places_base_url", &self.places_base_url)
            .field("gateway_url", &self.gateway_url)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("page_delay_ms", &self.page_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("dedup_policy", &self.dedup_policy)
            .field("session_check", &self.session_check)
            .field("auth_wait_secs", &self.auth_wait_secs)
            .field("session_idle_secs", &self.session_idle_secs)
            .finish()
    }
}

/// Per-client HTTP knobs shared by the places and gateway clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure of a retriable request.
    pub max_retries: u32,
    /// Base for exponential backoff: the n-th retry waits `base * 2^(n-1)` ms.
    pub backoff_base_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "omnimap/0.1 (lead-search)".to_owned(),
            max_retries: 2,
            backoff_base_ms: 1000,
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout_secs: self.request_timeout_secs,
            user_agent: self.user_agent.clone(),
            max_retries: self.max_retries,
            backoff_base_ms: self.retry_backoff_base_secs.saturating_mul(1000),
        }
    }
}
