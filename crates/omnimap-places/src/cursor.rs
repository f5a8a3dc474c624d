//! Paginated text search as a lazy, pull-based sequence of batches.
//!
//! A [`SearchCursor`] issues the first request when first polled and then
//! follows continuation tokens until the provider runs out, the running
//! total reaches the query's target, or something goes wrong. Failures
//! never escape: they end the sequence early and are reported through
//! [`SearchOutcome`].

use std::time::Duration;

use omnimap_core::{CancelSignal, PlaceRecord, SearchQuery, MIN_PAGE_DELAY_MS};
use serde::Serialize;
use tokio::time::Instant;

use crate::provider::PlacesProvider;
use crate::types::ProviderStatus;

/// Hard ceiling on pages per cursor. Guards against a provider handing out
/// continuation tokens forever.
pub const MAX_PAGES: usize = 50;

#[derive(Debug, Clone)]
pub struct CursorOptions {
    page_delay: Duration,
    cancel: CancelSignal,
}

impl CursorOptions {
    /// Delays below the provider's 2000 ms token warm-up are raised to it.
    #[must_use]
    pub fn new(page_delay_ms: u64) -> Self {
        Self {
            page_delay: Duration::from_millis(page_delay_ms.max(MIN_PAGE_DELAY_MS)),
            cancel: CancelSignal::never(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self::new(MIN_PAGE_DELAY_MS)
    }
}

/// Why a cursor stopped producing batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum CursorEnd {
    /// The provider sent no continuation token.
    Exhausted,
    TargetReached,
    ZeroResults,
    /// A page came back with a status other than `OK`/`ZERO_RESULTS`.
    ProviderStatus(String),
    /// The request failed after retries.
    Transport(String),
    PageLimit,
    Cancelled,
}

impl CursorEnd {
    /// `true` when the sequence was cut short by a provider failure rather
    /// than ending normally.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            CursorEnd::ProviderStatus(_) | CursorEnd::Transport(_) | CursorEnd::PageLimit
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub pages: usize,
    pub records: usize,
    pub end: CursorEnd,
}

#[derive(Debug)]
enum State {
    Start,
    Pending { token: String, not_before: Instant },
    Done(CursorEnd),
}

pub struct SearchCursor<'a, P: PlacesProvider + ?Sized> {
    provider: &'a P,
    query: SearchQuery,
    options: CursorOptions,
    state: State,
    pages: usize,
    yielded: usize,
}

impl<'a, P: PlacesProvider + ?Sized> SearchCursor<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P, query: SearchQuery, options: CursorOptions) -> Self {
        Self {
            provider,
            query,
            options,
            state: State::Start,
            pages: 0,
            yielded: 0,
        }
    }

    /// Fetches the next page, waiting out the continuation delay first.
    ///
    /// Returns `None` once the sequence has ended; it never restarts.
    /// Taking `&mut self` means at most one request per cursor is ever in
    /// flight.
    pub async fn next_batch(&mut self) -> Option<Vec<PlaceRecord>> {
        let token = match &self.state {
            State::Done(_) => return None,
            State::Start => None,
            State::Pending { token, not_before } => {
                let (token, not_before) = (token.clone(), *not_before);
                if !self.options.cancel.sleep_until(not_before).await {
                    return self.finish(CursorEnd::Cancelled);
                }
                Some(token)
            }
        };

        let request = self.provider.text_search(&self.query, token.as_deref());
        let Some(result) = self.options.cancel.run(request).await else {
            return self.finish(CursorEnd::Cancelled);
        };
        let received_at = Instant::now();

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    query = %self.query.text,
                    anchor = %self.query.anchor.location_param(),
                    pages = self.pages,
                    error = %e,
                    "places search failed; keeping results fetched so far"
                );
                return self.finish(CursorEnd::Transport(e.to_string()));
            }
        };
        self.pages += 1;

        match page.status {
            ProviderStatus::Ok => {}
            ProviderStatus::ZeroResults => {
                tracing::debug!(
                    query = %self.query.text,
                    pages = self.pages,
                    "places search returned ZERO_RESULTS"
                );
                return self.finish(CursorEnd::ZeroResults);
            }
            ProviderStatus::Other(status) => {
                tracing::warn!(
                    query = %self.query.text,
                    anchor = %self.query.anchor.location_param(),
                    pages = self.pages,
                    status = %status,
                    error_message = page.error_message.as_deref().unwrap_or(""),
                    "places search truncated by provider status"
                );
                return self.finish(CursorEnd::ProviderStatus(status));
            }
        }

        let batch = page.results;
        self.yielded += batch.len();
        tracing::debug!(
            page = self.pages,
            batch = batch.len(),
            total = self.yielded,
            target = self.query.target_count,
            "places page received"
        );

        self.state = match page.next_page_token {
            None => State::Done(CursorEnd::Exhausted),
            Some(_) if self.yielded >= self.query.target_count => {
                State::Done(CursorEnd::TargetReached)
            }
            Some(_) if self.pages >= MAX_PAGES => {
                tracing::warn!(
                    query = %self.query.text,
                    max_pages = MAX_PAGES,
                    "places search hit the page ceiling"
                );
                State::Done(CursorEnd::PageLimit)
            }
            Some(token) => State::Pending {
                token,
                not_before: received_at + self.options.page_delay,
            },
        };

        Some(batch)
    }

    /// Drains the cursor.
    pub async fn collect_all(mut self) -> (Vec<PlaceRecord>, SearchOutcome) {
        let mut all = Vec::new();
        while let Some(batch) = self.next_batch().await {
            all.extend(batch);
        }
        let outcome = self.outcome().unwrap_or(SearchOutcome {
            pages: self.pages,
            records: self.yielded,
            end: CursorEnd::Exhausted,
        });
        (all, outcome)
    }

    /// Summary of the finished sequence; `None` while more batches may come.
    #[must_use]
    pub fn outcome(&self) -> Option<SearchOutcome> {
        match &self.state {
            State::Done(end) => Some(SearchOutcome {
                pages: self.pages,
                records: self.yielded,
                end: end.clone(),
            }),
            State::Start | State::Pending { .. } => None,
        }
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done(_))
    }

    fn finish(&mut self, end: CursorEnd) -> Option<Vec<PlaceRecord>> {
        if end == CursorEnd::Cancelled {
            tracing::info!(
                query = %self.query.text,
                pages = self.pages,
                "places search cancelled"
            );
        }
        self.state = State::Done(end);
        None
    }
}
