use async_trait::async_trait;
use omnimap_core::SearchQuery;

use crate::error::PlacesError;
use crate::types::{DetailResponse, SearchPage};

/// The two capabilities the orchestration loops need from a places
/// directory. [`crate::PlacesClient`] is the HTTP implementation; tests
/// substitute in-process fakes.
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Fetches one text-search page. With `page_token` set, the query is
    /// ignored and the provider continues the earlier search.
    async fn text_search(
        &self,
        query: &SearchQuery,
        page_token: Option<&str>,
    ) -> Result<SearchPage, PlacesError>;

    async fn place_details(&self, place_id: &str) -> Result<DetailResponse, PlacesError>;
}
