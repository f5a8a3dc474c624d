use std::time::Duration;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{AuthStatus, QrCode, SendRequest, SendResponse};

/// Outbound messaging channel. Delivery guarantees belong to the gateway;
/// callers only see whether each request was accepted.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send(&self, request: &SendRequest) -> Result<SendResponse, GatewayError>;

    /// Whether `session_id` is still linked to a messaging account.
    async fn validate_session(&self, session_id: &str) -> Result<bool, GatewayError>;

    async fn generate_qr(&self) -> Result<QrCode, GatewayError>;

    /// Follows the auth-status stream for `session_id` until it reports
    /// `authenticated`, closes, or `timeout` elapses
    /// ([`GatewayError::AuthTimeout`]). Returns the last status seen.
    async fn wait_for_authentication(
        &self,
        session_id: &str,
        timeout: Duration,
    ) -> Result<AuthStatus, GatewayError>;

    /// Contacts known to the linked messaging account, as the gateway
    /// reports them.
    async fn contacts(&self, session_id: &str) -> Result<Vec<serde_json::Value>, GatewayError>;
}
