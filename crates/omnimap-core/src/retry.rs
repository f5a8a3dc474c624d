//! Retry with exponential back-off and jitter, shared by the HTTP clients.
//!
//! Each client decides which of its errors are transient by implementing
//! [`Retriable`]; the loop itself is the same everywhere.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

const MAX_DELAY_MS: u64 = 30_000;

/// Classifies a failed attempt for [`retry_with_backoff`].
pub trait Retriable {
    /// Whether another attempt could succeed.
    fn is_retriable(&self) -> bool;

    /// Minimum wait the server asked for, e.g. a 429 `Retry-After`.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors.
///
/// The wait before retry `n` is `backoff_base_ms * 2^(n-1)` scaled by a
/// random factor in `[0.75, 1.25)`, capped at 30 s. A server-requested wait
/// larger than that replaces it, under the same cap. `target` names the
/// upstream in the retry log line.
///
/// # Errors
///
/// Returns the last error once it is not retriable or the retries run out.
pub async fn retry_with_backoff<T, E, F, Fut>(
    target: &'static str,
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, E>
where
    E: Retriable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let mut delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                if let Some(wait) = err.retry_after() {
                    let wait_ms = u64::try_from(wait.as_millis()).unwrap_or(MAX_DELAY_MS);
                    delay_ms = delay_ms.max(wait_ms.min(MAX_DELAY_MS));
                }
                tracing::warn!(
                    target_service = target,
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "request failed; retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
