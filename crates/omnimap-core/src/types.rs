//! Place, enrichment and dispatch records shared across the workspace.

use serde::{Deserialize, Serialize};

/// A places-directory entry as returned by the text-search endpoint.
///
/// Only the identity and display fields are typed; everything else the
/// provider sends is kept verbatim in `extra` so nothing is lost on the way
/// to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    /// Primary location hint shown next to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PlaceRecord {
    #[must_use]
    pub fn new(place_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            place_id: place_id.into(),
            name: name.into(),
            formatted_address: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// A [`PlaceRecord`] plus the optional contact fields added by enrichment.
///
/// Every contact field is optional: a record that was never enriched, or
/// whose lookup failed, simply carries `None` in each of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPlaceRecord {
    #[serde(flatten)]
    pub place: PlaceRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_local: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_international: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl EnrichedPlaceRecord {
    /// Returns the international phone number when it is usable as a
    /// messaging recipient (present and not blank).
    #[must_use]
    pub fn recipient(&self) -> Option<&str> {
        self.phone_international
            .as_deref()
            .filter(|p| !p.trim().is_empty())
    }
}

impl From<PlaceRecord> for EnrichedPlaceRecord {
    fn from(place: PlaceRecord) -> Self {
        Self {
            place,
            phone_local: None,
            phone_international: None,
            website: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchOutcome {
    Success,
    Failure,
}

/// Outcome of one outbound message. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// Recipient identifier the message was addressed to.
    pub target: String,
    pub outcome: DispatchOutcome,
    /// Gateway acknowledgement on success, error text on failure.
    pub detail: String,
}

/// What dispatch does when the messaging session cannot be confirmed valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionCheckPolicy {
    /// Log the failed check and send anyway.
    #[default]
    Warn,
    /// Refuse to send anything.
    Block,
}

impl std::fmt::Display for SessionCheckPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionCheckPolicy::Warn => write!(f, "warn"),
            SessionCheckPolicy::Block => write!(f, "block"),
        }
    }
}
