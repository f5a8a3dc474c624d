//! Wire types for the messaging gateway.

use serde::{Deserialize, Serialize, Serializer};

/// Body of `POST /send`. The gateway expects PascalCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendRequest {
    pub recipient: String,
    pub message: String,
    #[serde(rename = "SessionID")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionValidity {
    #[serde(rename = "isValid", default)]
    pub is_valid: bool,
}

/// A freshly minted gateway session and the QR code that links it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCode {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    /// Base64-encoded PNG.
    #[serde(rename = "qrCode")]
    pub qr_code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ContactList {
    #[serde(default)]
    pub contacts: Vec<serde_json::Value>,
}

/// One `data:` payload of the auth-status event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Pending,
    Waiting,
    Authenticated,
    Unknown(String),
}

impl AuthStatus {
    #[must_use]
    pub fn parse(data: &str) -> Self {
        match data.trim() {
            "pending" => AuthStatus::Pending,
            "waiting" => AuthStatus::Waiting,
            "authenticated" => AuthStatus::Authenticated,
            other => AuthStatus::Unknown(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            AuthStatus::Pending => "pending",
            AuthStatus::Waiting => "waiting",
            AuthStatus::Authenticated => "authenticated",
            AuthStatus::Unknown(s) => s,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        *self == AuthStatus::Authenticated
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuthStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
