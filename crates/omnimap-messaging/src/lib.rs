//! Messaging-gateway client and the dispatch loop that sends one message
//! per contactable place.

mod auth_status;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub(crate) mod retry;
pub mod types;

pub use client::GatewayClient;
pub use dispatch::{DispatchGate, DispatchReport};
pub use error::{DispatchError, GatewayError};
pub use gateway::MessagingGateway;
pub use types::{AuthStatus, QrCode, SendRequest, SendResponse};
