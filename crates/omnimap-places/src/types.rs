//! Wire types for the places-directory JSON API.

use omnimap_core::PlaceRecord;
use serde::Deserialize;

/// The `status` field every places response carries.
///
/// Only `OK` and `ZERO_RESULTS` drive control flow; every other value
/// (`OVER_QUERY_LIMIT`, `REQUEST_DENIED`, `INVALID_REQUEST`, ...) is kept
/// verbatim for logging.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ProviderStatus {
    Ok,
    ZeroResults,
    Other(String),
}

impl From<String> for ProviderStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "OK" => ProviderStatus::Ok,
            "ZERO_RESULTS" => ProviderStatus::ZeroResults,
            _ => ProviderStatus::Other(raw),
        }
    }
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderStatus::Ok => write!(f, "OK"),
            ProviderStatus::ZeroResults => write!(f, "ZERO_RESULTS"),
            ProviderStatus::Other(s) => write!(f, "{s}"),
        }
    }
}

/// One page of text-search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub status: ProviderStatus,
    pub results: Vec<PlaceRecord>,
    /// Continuation cursor; redeemable only after the provider's delay.
    pub next_page_token: Option<String>,
    pub error_message: Option<String>,
}

impl SearchPage {
    #[must_use]
    pub fn ok(results: Vec<PlaceRecord>, next_page_token: Option<&str>) -> Self {
        Self {
            status: ProviderStatus::Ok,
            results,
            next_page_token: next_page_token.map(str::to_owned),
            error_message: None,
        }
    }

    #[must_use]
    pub fn with_status(status: ProviderStatus) -> Self {
        Self {
            status,
            results: Vec::new(),
            next_page_token: None,
            error_message: None,
        }
    }
}

/// Text-search body as sent by the provider. Results stay untyped until
/// [`RawSearchPage::into_page`] so one malformed entry cannot sink a page.
#[derive(Debug, Deserialize)]
pub(crate) struct RawSearchPage {
    status: ProviderStatus,
    #[serde(default)]
    results: Vec<serde_json::Value>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

impl RawSearchPage {
    pub(crate) fn into_page(self) -> SearchPage {
        let total = self.results.len();
        let results: Vec<PlaceRecord> = self
            .results
            .into_iter()
            .filter_map(|v| serde_json::from_value::<PlaceRecord>(v).ok())
            .collect();
        if results.len() < total {
            tracing::debug!(
                dropped = total - results.len(),
                "skipped search results without a usable place_id"
            );
        }
        SearchPage {
            status: self.status,
            results,
            next_page_token: self.next_page_token.filter(|t| !t.is_empty()),
            error_message: self.error_message,
        }
    }
}

/// Contact fields requested from the details endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlaceDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub international_phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetailResponse {
    pub status: ProviderStatus,
    #[serde(default)]
    pub result: Option<PlaceDetails>,
    #[serde(default)]
    pub error_message: Option<String>,
}
