//! HTTP client for the places directory's legacy JSON API.
//!
//! Wraps `reqwest` with API key handling, typed response parsing and
//! retry on transient failures. Provider statuses are returned to the
//! caller untouched; only the orchestration loops decide what they mean.

use std::time::Duration;

use async_trait::async_trait;
use omnimap_core::{retry_with_backoff, HttpSettings, SearchQuery};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::PlacesError;
use crate::provider::PlacesProvider;
use crate::types::{DetailResponse, RawSearchPage, SearchPage};

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place/";

/// Contact fields requested from the details endpoint. Keeping the mask
/// narrow keeps each lookup in the cheapest billing tier.
pub const DETAIL_FIELDS: &str = "name,formatted_phone_number,international_phone_number,website";

pub struct PlacesClient {
    client: Client,
    api_key: String,
    search_url: Url,
    details_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl PlacesClient {
    /// Creates a client pointed at the production places API.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, settings: &HttpSettings) -> Result<Self, PlacesError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, settings)
    }

    /// Creates a client with a custom base URL (a proxy, or wiremock in tests).
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`PlacesError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        settings: &HttpSettings,
    ) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash, so joining keeps the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let invalid = |reason: String| PlacesError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason,
        };
        let base = Url::parse(&normalised).map_err(|e| invalid(e.to_string()))?;
        let search_url = base
            .join("textsearch/json")
            .map_err(|e| invalid(e.to_string()))?;
        let details_url = base
            .join("details/json")
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            search_url,
            details_url,
            max_retries: settings.max_retries,
            backoff_base_ms: settings.backoff_base_ms,
        })
    }

    /// Builds a text-search URL. A continuation request carries only the
    /// key and the page token; the provider rejects anything else.
    fn text_search_url(&self, query: &SearchQuery, page_token: Option<&str>) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(token) = page_token {
                pairs.append_pair("pagetoken", token);
            } else {
                pairs.append_pair("query", &query.text);
                pairs.append_pair("location", &query.anchor.location_param());
                pairs.append_pair("radius", &query.radius_meters.to_string());
                if let Some(category) = &query.category {
                    pairs.append_pair("type", category);
                }
            }
            pairs.append_pair("key", &self.api_key);
        }
        url
    }

    fn details_url(&self, place_id: &str) -> Url {
        let mut url = self.details_url.clone();
        url.query_pairs_mut()
            .append_pair("place_id", place_id)
            .append_pair("fields", DETAIL_FIELDS)
            .append_pair("key", &self.api_key);
        url
    }

    /// Sends a GET with retry and parses the body as `T`.
    ///
    /// Errors name the endpoint path only; the full URL carries the key.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, PlacesError> {
        retry_with_backoff("places", self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(1);
                    return Err(PlacesError::RateLimited { retry_after_secs });
                }

                if !status.is_success() {
                    return Err(PlacesError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.path().to_owned(),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<T>(&body).map_err(|e| PlacesError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })
            }
        })
        .await
    }
}

#[async_trait]
impl PlacesProvider for PlacesClient {
    async fn text_search(
        &self,
        query: &SearchQuery,
        page_token: Option<&str>,
    ) -> Result<SearchPage, PlacesError> {
        let url = self.text_search_url(query, page_token);
        let context = if page_token.is_some() {
            format!("textsearch continuation for \"{}\"", query.text)
        } else {
            format!("textsearch \"{}\" at {}", query.text, query.anchor.location_param())
        };
        let raw: RawSearchPage = self.get_json(url, &context).await?;
        Ok(raw.into_page())
    }

    async fn place_details(&self, place_id: &str) -> Result<DetailResponse, PlacesError> {
        let url = self.details_url(place_id);
        self.get_json(url, &format!("details(place_id={place_id})"))
            .await
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
