use omnimap_core::CoreError;
use omnimap_messaging::GatewayError;
use thiserror::Error;
use uuid::Uuid;

use crate::accounts::AccountsError;
use crate::phase::Phase;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is busy ({phase}); wait for the current stage to finish")]
    Busy { phase: Phase },

    #[error("places must be enriched before dispatch")]
    NotEnriched,

    #[error("sign in to use this feature")]
    SignInRequired,

    #[error("upgrade to a paid plan to use this feature")]
    UpgradeRequired,

    #[error("add at least one anchor before searching")]
    NoAnchors,

    #[error("no places to enrich")]
    NoPlaces,

    #[error("no messaging gateway linked; generate a QR code first")]
    GatewayNotLinked,

    #[error("messaging session is not valid; link the gateway again")]
    GatewaySessionInvalid,

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("anchor {0} not found")]
    AnchorNotFound(String),

    #[error("no place at index {0}")]
    PlaceNotFound(usize),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("account lookup failed: {0}")]
    Accounts(#[from] AccountsError),

    #[error("session was closed while the stage was running")]
    Cancelled,

    #[error("place list changed during {0}")]
    Conflict(&'static str),
}
