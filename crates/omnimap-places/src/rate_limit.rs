//! Which places failures are worth another attempt.
//!
//! A provider-level status such as `OVER_QUERY_LIMIT` arrives inside a 200
//! response and is handled by the caller, never here.

use std::time::Duration;

use omnimap_core::Retriable;

use crate::error::PlacesError;

/// Retriable: HTTP 429, 5xx responses, timeouts and connection failures.
/// Everything else (4xx, malformed JSON, bad base URL) is returned at once.
impl Retriable for PlacesError {
    fn is_retriable(&self) -> bool {
        match self {
            PlacesError::RateLimited { .. } => true,
            PlacesError::UnexpectedStatus { status, .. } => *status >= 500,
            PlacesError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            PlacesError::Deserialize { .. } | PlacesError::InvalidBaseUrl { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            PlacesError::RateLimited { retry_after_secs } => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use omnimap_core::retry_with_backoff;

    use super::*;

    fn deserialize_err() -> PlacesError {
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        PlacesError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }
    }

    #[test]
    fn rate_limited_is_retriable_and_carries_its_wait() {
        let err = PlacesError::RateLimited {
            retry_after_secs: 4,
        };
        assert!(err.is_retriable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(4)));
    }

    #[test]
    fn server_errors_are_retriable_client_errors_are_not() {
        assert!(PlacesError::UnexpectedStatus {
            status: 503,
            url: "/textsearch/json".to_owned()
        }
        .is_retriable());
        assert!(!PlacesError::UnexpectedStatus {
            status: 403,
            url: "/textsearch/json".to_owned()
        }
        .is_retriable());
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        assert!(!deserialize_err().is_retriable());
        assert_eq!(deserialize_err().retry_after(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn honours_retry_after_on_429() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let started = tokio::time::Instant::now();
        let result = retry_with_backoff("places", 1, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(PlacesError::RateLimited {
                        retry_after_secs: 3,
                    })
                } else {
                    Ok("page")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "page");
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_deserialize_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff("places", 3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(deserialize_err())
            }
        })
        .await;
        assert!(matches!(result, Err(PlacesError::Deserialize { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
