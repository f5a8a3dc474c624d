//! Which gateway failures are worth another attempt.
//!
//! `POST /send` is never retried: a retried send can deliver the same
//! message twice.

use omnimap_core::Retriable;

use crate::error::GatewayError;

impl Retriable for GatewayError {
    fn is_retriable(&self) -> bool {
        match self {
            GatewayError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            GatewayError::Http(e) => e.is_timeout() || e.is_connect(),
            GatewayError::Deserialize { .. }
            | GatewayError::InvalidBaseUrl { .. }
            | GatewayError::Stream(_)
            | GatewayError::AuthTimeout { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use omnimap_core::retry_with_backoff;

    use super::*;

    fn status(code: u16) -> GatewayError {
        GatewayError::UnexpectedStatus {
            status: code,
            endpoint: "validate-session".to_owned(),
        }
    }

    #[test]
    fn only_transient_statuses_are_retriable() {
        assert!(status(429).is_retriable());
        assert!(status(502).is_retriable());
        assert!(!status(404).is_retriable());
        assert!(!GatewayError::AuthTimeout { secs: 1 }.is_retriable());
    }

    #[tokio::test]
    async fn client_errors_fail_fast() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff("gateway", 5, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(status(400))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
