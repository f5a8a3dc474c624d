use omnimap_core::CoreError;
use thiserror::Error;

/// Errors returned by the messaging-gateway client.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("gateway returned HTTP {status} for {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    #[error("invalid gateway URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("auth-status stream error: {0}")]
    Stream(String),

    #[error("gateway session not authenticated within {secs}s")]
    AuthTimeout { secs: u64 },
}

/// Reasons a dispatch run is refused before anything is sent.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("messaging session is not valid; link the gateway again before sending")]
    SessionInvalid,
}

/// Request URLs carry credentials, so the URL is dropped before the error
/// can reach a log line or a response body.
impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}
