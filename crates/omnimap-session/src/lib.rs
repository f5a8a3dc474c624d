//! Per-user session context: anchors, aggregated places and the stage
//! machine that drives search, enrichment and dispatch.

pub mod accounts;
pub mod error;
pub mod phase;
pub mod registry;
pub mod session;

pub use accounts::{connect_pool, AccountDirectory, AccountsError, OpenAccounts, PgAccountDirectory};
pub use error::SessionError;
pub use phase::{Phase, PhaseGate, StageGuard};
pub use registry::SessionRegistry;
pub use session::{
    AnchorInput, AnchorOutcome, EnrichReport, PlacesPage, SearchParams, SearchReport, Session,
    SessionDeps, SessionSettings, SessionSummary,
};
