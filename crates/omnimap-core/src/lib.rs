pub mod aggregate;
pub mod anchors;
mod app_config;
pub mod cancel;
mod config;
pub mod query;
pub mod retry;
pub mod types;

use thiserror::Error;

pub use aggregate::{DedupPolicy, Page, ResultAggregator, PAGE_SIZE};
pub use anchors::{parse_coordinates, Anchor, AnchorList};
pub use app_config::{AppConfig, Environment, HttpSettings};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::{load_app_config, load_app_config_from_env, MIN_PAGE_DELAY_MS};
pub use query::SearchQuery;
pub use retry::{retry_with_backoff, Retriable};
pub use types::{
    DispatchOutcome, DispatchResult, EnrichedPlaceRecord, PlaceRecord, SessionCheckPolicy,
};

/// Validation failures raised at user-entry boundaries.
///
/// Each one blocks only the submission that produced it.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("no coordinate pair found in map link \"{0}\"")]
    UnrecognizedMapLink(String),

    #[error("coordinate out of range: lat {lat}, lng {lng}")]
    CoordinateOutOfRange { lat: f64, lng: f64 },

    #[error("invalid search query: {0}")]
    InvalidQuery(String),

    #[error("message body must not be empty")]
    EmptyMessage,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
