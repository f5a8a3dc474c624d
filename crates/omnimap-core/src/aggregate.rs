//! Ordered, session-owned collection of search results.
//!
//! Batches are appended in arrival order (anchor-major, page-minor). The
//! page view is pure slicing for display; it never fetches anything.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{EnrichedPlaceRecord, PlaceRecord};

/// Items per display page.
pub const PAGE_SIZE: usize = 10;

/// Whether repeated `place_id`s across anchors and pages are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    #[default]
    KeepAll,
    ByPlaceId,
}

impl std::fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupPolicy::KeepAll => write!(f, "keep-all"),
            DedupPolicy::ByPlaceId => write!(f, "by-place-id"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<'a> {
    pub items: &'a [EnrichedPlaceRecord],
    /// 1-based page number after clamping.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    records: Vec<EnrichedPlaceRecord>,
    dedup: DedupPolicy,
}

impl ResultAggregator {
    #[must_use]
    pub fn new(dedup: DedupPolicy) -> Self {
        Self {
            records: Vec::new(),
            dedup,
        }
    }

    /// Appends a batch, returning how many records were actually added.
    pub fn append(&mut self, batch: Vec<PlaceRecord>) -> usize {
        let before = self.records.len();
        match self.dedup {
            DedupPolicy::KeepAll => {
                self.records
                    .extend(batch.into_iter().map(EnrichedPlaceRecord::from));
            }
            DedupPolicy::ByPlaceId => {
                let mut seen: HashSet<String> = self
                    .records
                    .iter()
                    .map(|r| r.place.place_id.clone())
                    .collect();
                for place in batch {
                    if seen.insert(place.place_id.clone()) {
                        self.records.push(place.into());
                    }
                }
            }
        }
        self.records.len() - before
    }

    /// Removes the record at `index` (0-based over the whole collection).
    pub fn remove(&mut self, index: usize) -> Option<EnrichedPlaceRecord> {
        (index < self.records.len()).then(|| self.records.remove(index))
    }

    /// Swaps in an enrichment result.
    ///
    /// Returns `false` and leaves the collection untouched if the lengths
    /// differ, which means the collection changed while enrichment ran.
    pub fn replace_enriched(&mut self, enriched: Vec<EnrichedPlaceRecord>) -> bool {
        if enriched.len() != self.records.len() {
            return false;
        }
        self.records = enriched;
        true
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[EnrichedPlaceRecord] {
        &self.records
    }

    #[must_use]
    pub fn dedup_policy(&self) -> DedupPolicy {
        self.dedup
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.records.len().div_ceil(PAGE_SIZE)
    }

    /// Returns the 1-based `page`, clamped into `[1, total_pages]`.
    #[must_use]
    pub fn page(&self, page: usize) -> Page<'_> {
        let total_pages = self.total_pages();
        let page = page.clamp(1, total_pages.max(1));
        let start = ((page - 1) * PAGE_SIZE).min(self.records.len());
        let end = (start + PAGE_SIZE).min(self.records.len());
        Page {
            items: &self.records[start..end],
            page,
            total_pages,
            total_items: self.records.len(),
        }
    }
}
