//! In-process `PlacesProvider` with scripted answers and a call log, for
//! tests that need the paused tokio clock (wiremock needs real time).

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use omnimap_core::{Anchor, PlaceRecord, SearchQuery};
use omnimap_places::{
    DetailResponse, PlaceDetails, PlacesError, PlacesProvider, ProviderStatus, SearchPage,
};
use tokio::time::Instant;

pub enum PageScript {
    Page(SearchPage),
    Fail,
}

#[derive(Clone)]
pub enum DetailScript {
    Found(PlaceDetails),
    Status(&'static str),
    Fail,
    Hang,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub page_token: Option<String>,
    pub sent_at: Instant,
    pub answered_at: Instant,
}

#[derive(Default)]
pub struct FakePlaces {
    pages: Mutex<VecDeque<PageScript>>,
    endless: Option<SearchPage>,
    details: HashMap<String, DetailScript>,
    latency: Duration,
    calls: Mutex<Vec<Call>>,
    detail_calls: Mutex<Vec<String>>,
}

impl FakePlaces {
    pub fn pages(pages: Vec<PageScript>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Self::default()
        }
    }

    /// Answers every search request with `page`.
    pub fn endless(page: SearchPage) -> Self {
        Self {
            endless: Some(page),
            ..Self::default()
        }
    }

    pub fn with_details(details: Vec<(&str, DetailScript)>) -> Self {
        Self {
            details: details
                .into_iter()
                .map(|(id, d)| (id.to_owned(), d))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlacesProvider for FakePlaces {
    async fn text_search(
        &self,
        _query: &SearchQuery,
        page_token: Option<&str>,
    ) -> Result<SearchPage, PlacesError> {
        let sent_at = Instant::now();
        tokio::time::sleep(self.latency).await;
        self.calls.lock().unwrap().push(Call {
            page_token: page_token.map(str::to_owned),
            sent_at,
            answered_at: Instant::now(),
        });

        if let Some(page) = &self.endless {
            return Ok(page.clone());
        }
        match self.pages.lock().unwrap().pop_front() {
            Some(PageScript::Page(page)) => Ok(page),
            Some(PageScript::Fail) | None => Err(PlacesError::UnexpectedStatus {
                status: 503,
                url: "/textsearch/json".to_owned(),
            }),
        }
    }

    async fn place_details(&self, place_id: &str) -> Result<DetailResponse, PlacesError> {
        self.detail_calls.lock().unwrap().push(place_id.to_owned());
        tokio::time::sleep(self.latency).await;
        match self.details.get(place_id).cloned() {
            Some(DetailScript::Found(details)) => Ok(DetailResponse {
                status: ProviderStatus::Ok,
                result: Some(details),
                error_message: None,
            }),
            Some(DetailScript::Status(status)) => Ok(DetailResponse {
                status: ProviderStatus::from(status.to_owned()),
                result: None,
                error_message: None,
            }),
            Some(DetailScript::Hang) => std::future::pending().await,
            Some(DetailScript::Fail) | None => Err(PlacesError::UnexpectedStatus {
                status: 500,
                url: "/details/json".to_owned(),
            }),
        }
    }
}

pub fn records(prefix: &str, n: usize) -> Vec<PlaceRecord> {
    (0..n)
        .map(|i| PlaceRecord::new(format!("{prefix}-{i}"), format!("Place {prefix} {i}")))
        .collect()
}

pub fn ok_page(prefix: &str, n: usize, token: Option<&str>) -> PageScript {
    PageScript::Page(SearchPage::ok(records(prefix, n), token))
}

/// Built directly: the cursor trusts whatever query it is handed, so tests
/// can use targets below the validated range.
pub fn query(target_count: usize) -> SearchQuery {
    SearchQuery {
        text: "bakery".to_owned(),
        anchor: Anchor::from_pin(53.5, 10.0).unwrap(),
        radius_meters: 5000,
        category: Some("bakery".to_owned()),
        target_count,
    }
}
