use thiserror::Error;

/// Errors returned by the places-directory client.
///
/// A non-`OK` provider status is not an error at this level: it arrives as
/// [`crate::ProviderStatus`] inside a successfully parsed response.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by places provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid places base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

/// Request URLs carry credentials, so the URL is dropped before the error
/// can reach a log line or a response body.
impl From<reqwest::Error> for PlacesError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}
