//! Places-directory client and the two orchestration loops built on it:
//! the paginated search cursor and the concurrent enrichment pass.

pub mod client;
pub mod cursor;
pub mod enrich;
pub mod error;
pub mod normalize;
pub mod provider;
pub(crate) mod rate_limit;
pub mod types;

pub use client::PlacesClient;
pub use cursor::{CursorEnd, CursorOptions, SearchCursor, SearchOutcome, MAX_PAGES};
pub use enrich::EnrichmentCoordinator;
pub use error::PlacesError;
pub use normalize::normalize_phone;
pub use provider::PlacesProvider;
pub use types::{DetailResponse, PlaceDetails, ProviderStatus, SearchPage};
