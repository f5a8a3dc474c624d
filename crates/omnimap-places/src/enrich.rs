//! Concurrent detail lookups that add contact fields to search results.

use futures::future::join_all;
use omnimap_core::{CancelSignal, EnrichedPlaceRecord};

use crate::normalize::{non_blank, normalize_phone};
use crate::provider::PlacesProvider;
use crate::types::{PlaceDetails, ProviderStatus};

/// Runs one detail lookup per record, all at once, and maps each answer
/// back onto the record it came from.
///
/// Per-record isolation: a transport error, a non-`OK` status or a
/// cancellation leaves that record exactly as it was. The output always has
/// the same length and order as the input.
pub struct EnrichmentCoordinator<'a, P: PlacesProvider + ?Sized> {
    provider: &'a P,
    cancel: CancelSignal,
}

impl<'a, P: PlacesProvider + ?Sized> EnrichmentCoordinator<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            cancel: CancelSignal::never(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn enrich<R>(&self, records: Vec<R>) -> Vec<EnrichedPlaceRecord>
    where
        R: Into<EnrichedPlaceRecord>,
    {
        let total = records.len();
        let lookups = records
            .into_iter()
            .map(|r| self.enrich_one(r.into()));
        let enriched = join_all(lookups).await;

        let resolved = enriched.iter().filter(|(_, ok)| *ok).count();
        tracing::info!(
            total,
            resolved,
            failed = total - resolved,
            "enrichment pass finished"
        );
        enriched.into_iter().map(|(record, _)| record).collect()
    }

    /// Returns the record plus whether its lookup succeeded.
    async fn enrich_one(&self, mut record: EnrichedPlaceRecord) -> (EnrichedPlaceRecord, bool) {
        let place_id = record.place.place_id.clone();
        let Some(result) = self.cancel.run(self.provider.place_details(&place_id)).await else {
            return (record, false);
        };

        let details = match result {
            Ok(resp) if resp.status == ProviderStatus::Ok => resp.result.unwrap_or_default(),
            Ok(resp) => {
                tracing::warn!(
                    place_id = %place_id,
                    status = %resp.status,
                    "detail lookup returned non-OK status; record left unchanged"
                );
                return (record, false);
            }
            Err(e) => {
                tracing::warn!(
                    place_id = %place_id,
                    error = %e,
                    "detail lookup failed; record left unchanged"
                );
                return (record, false);
            }
        };

        apply_details(&mut record, details);
        (record, true)
    }
}

/// Overwrites the contact fields with what the lookup returned.
fn apply_details(record: &mut EnrichedPlaceRecord, details: PlaceDetails) {
    record.phone_local = non_blank(details.formatted_phone_number);
    record.phone_international = details
        .international_phone_number
        .as_deref()
        .and_then(normalize_phone);
    record.website = non_blank(details.website);
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnimap_core::PlaceRecord;

    #[test]
    fn apply_details_normalizes_and_blanks() {
        let mut record = EnrichedPlaceRecord::from(PlaceRecord::new("p1", "Cafe"));
        apply_details(
            &mut record,
            PlaceDetails {
                name: Some("Cafe".to_owned()),
                formatted_phone_number: Some("020 7946 0958".to_owned()),
                international_phone_number: Some("+44 20 7946 0958".to_owned()),
                website: Some("   ".to_owned()),
            },
        );
        assert_eq!(record.phone_local.as_deref(), Some("020 7946 0958"));
        assert_eq!(record.phone_international.as_deref(), Some("+442079460958"));
        assert_eq!(record.website, None);
    }

    #[test]
    fn apply_details_blank_international_number_is_not_a_recipient() {
        let mut record = EnrichedPlaceRecord::from(PlaceRecord::new("p1", "Cafe"));
        apply_details(
            &mut record,
            PlaceDetails {
                international_phone_number: Some("  ".to_owned()),
                ..PlaceDetails::default()
            },
        );
        assert!(record.recipient().is_none());
    }
}
