//! Sequential outbound dispatch: one message per contactable record.

use omnimap_core::{
    CancelSignal, CoreError, DispatchOutcome, DispatchResult, EnrichedPlaceRecord,
    SessionCheckPolicy,
};
use serde::Serialize;

use crate::error::DispatchError;
use crate::gateway::MessagingGateway;
use crate::types::SendRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub results: Vec<DispatchResult>,
    /// Records without a usable international phone number.
    pub skipped: usize,
    /// Outcome of the pre-send session check.
    pub session_valid: bool,
    /// Set when the run was cancelled before every record was tried.
    pub cancelled: bool,
}

impl DispatchReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == DispatchOutcome::Success)
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

pub struct DispatchGate<'a, G: MessagingGateway + ?Sized> {
    gateway: &'a G,
    policy: SessionCheckPolicy,
    cancel: CancelSignal,
}

impl<'a, G: MessagingGateway + ?Sized> DispatchGate<'a, G> {
    #[must_use]
    pub fn new(gateway: &'a G, policy: SessionCheckPolicy) -> Self {
        Self {
            gateway,
            policy,
            cancel: CancelSignal::never(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sends `message` to every record with a recipient, one at a time.
    ///
    /// A failed send is recorded and the loop moves on. Records without a
    /// phone number are counted in `skipped`, never sent.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Invalid`] if `message` is blank.
    /// - [`DispatchError::SessionInvalid`] under [`SessionCheckPolicy::Block`]
    ///   when the gateway session cannot be confirmed.
    pub async fn dispatch(
        &self,
        records: &[EnrichedPlaceRecord],
        message: &str,
        session_token: Option<&str>,
    ) -> Result<DispatchReport, DispatchError> {
        if message.trim().is_empty() {
            return Err(CoreError::EmptyMessage.into());
        }

        let session_valid = self.check_session(session_token).await;
        if !session_valid {
            match self.policy {
                SessionCheckPolicy::Block => {
                    tracing::warn!("messaging session invalid; dispatch blocked");
                    return Err(DispatchError::SessionInvalid);
                }
                SessionCheckPolicy::Warn => {
                    tracing::warn!("messaging session invalid; sending anyway");
                }
            }
        }

        let mut report = DispatchReport {
            session_valid,
            ..DispatchReport::default()
        };

        for record in records {
            let Some(recipient) = record.recipient() else {
                report.skipped += 1;
                continue;
            };

            let request = SendRequest {
                recipient: recipient.to_owned(),
                message: message.to_owned(),
                session_id: session_token.map(str::to_owned),
            };
            let Some(sent) = self.cancel.run(self.gateway.send(&request)).await else {
                report.cancelled = true;
                tracing::info!(sent = report.results.len(), "dispatch cancelled");
                break;
            };

            let result = match sent {
                Ok(resp) => {
                    tracing::info!(place_id = %record.place.place_id, "message sent");
                    DispatchResult {
                        target: request.recipient,
                        outcome: DispatchOutcome::Success,
                        detail: resp.message,
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        place_id = %record.place.place_id,
                        error = %e,
                        "message send failed"
                    );
                    DispatchResult {
                        target: request.recipient,
                        outcome: DispatchOutcome::Failure,
                        detail: e.to_string(),
                    }
                }
            };
            report.results.push(result);
        }

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped,
            "dispatch finished"
        );
        Ok(report)
    }

    /// Any failure to confirm counts as invalid.
    async fn check_session(&self, session_token: Option<&str>) -> bool {
        let Some(token) = session_token else {
            return false;
        };
        match self.gateway.validate_session(token).await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(error = %e, "session validation request failed");
                false
            }
        }
    }
}
