//! Consumption of the gateway's `auth-status` server-sent event stream.

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};

use crate::error::GatewayError;
use crate::types::AuthStatus;

/// Reads events until one reports `authenticated` or the stream ends.
///
/// Returns the last status seen; `Pending` when the stream closed without
/// sending anything. Timeouts are the caller's concern.
pub(crate) async fn await_authenticated<S, B, E>(body: S) -> Result<AuthStatus, GatewayError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut events = std::pin::pin!(body.eventsource());
    let mut last = AuthStatus::Pending;

    while let Some(event) = events.next().await {
        let event = event.map_err(|e| GatewayError::Stream(e.to_string()))?;
        let status = AuthStatus::parse(&event.data);
        tracing::debug!(status = %status, "gateway auth status");
        if status.is_authenticated() {
            return Ok(status);
        }
        if let AuthStatus::Unknown(raw) = &status {
            tracing::warn!(status = %raw, "unrecognized gateway auth status");
        }
        last = status;
    }

    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn body(chunks: &[&'static str]) -> impl Stream<Item = Result<&'static [u8], String>> {
        stream::iter(chunks.iter().map(|c| Ok(c.as_bytes())).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn stops_at_authenticated() {
        let status = await_authenticated(body(&[
            "data: pending\n\n",
            "data: waiting\n\n",
            "data: authenticated\n\n",
            "data: pending\n\n",
        ]))
        .await
        .unwrap();
        assert_eq!(status, AuthStatus::Authenticated);
    }

    #[tokio::test]
    async fn events_split_across_chunks_are_reassembled() {
        let status = await_authenticated(body(&["data: authen", "ticated\n", "\n"]))
            .await
            .unwrap();
        assert_eq!(status, AuthStatus::Authenticated);
    }

    #[tokio::test]
    async fn stream_end_returns_last_status() {
        let status = await_authenticated(body(&["data: pending\n\n", "data: waiting\n\n"]))
            .await
            .unwrap();
        assert_eq!(status, AuthStatus::Waiting);
    }

    #[tokio::test]
    async fn empty_stream_is_pending() {
        let status = await_authenticated(body(&[])).await.unwrap();
        assert_eq!(status, AuthStatus::Pending);
    }

    #[tokio::test]
    async fn transport_error_surfaces_as_stream_error() {
        let chunks: Vec<Result<&'static [u8], String>> = vec![
            Ok(b"data: pending\n\n".as_slice()),
            Err("connection reset".to_owned()),
        ];
        let err = await_authenticated(stream::iter(chunks)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Stream(ref m) if m.contains("connection reset")));
    }
}
