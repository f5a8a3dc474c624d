//! One user's workspace: anchors, aggregated places and stage state.
//!
//! Every stage is user-triggered. Search, enrichment and dispatch each take
//! the in-flight guard for their duration and observe the session's cancel
//! signal, so closing a session stops whatever it is doing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use omnimap_core::{
    cancel_pair, Anchor, AnchorList, AppConfig, CancelHandle, DedupPolicy, EnrichedPlaceRecord,
    ResultAggregator, SearchQuery, SessionCheckPolicy,
};
use omnimap_messaging::{
    AuthStatus, DispatchError, DispatchGate, DispatchReport, MessagingGateway, QrCode,
};
use omnimap_places::{
    CursorEnd, CursorOptions, EnrichmentCoordinator, PlacesProvider, SearchCursor, SearchOutcome,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::accounts::AccountDirectory;
use crate::error::SessionError;
use crate::phase::{Phase, PhaseGate};

/// Knobs copied out of [`AppConfig`] so sessions do not hold the secrets.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub page_delay_ms: u64,
    pub dedup_policy: DedupPolicy,
    pub session_check: SessionCheckPolicy,
    pub auth_wait: Duration,
    pub idle_timeout: Duration,
}

impl SessionSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            page_delay_ms: config.page_delay_ms,
            dedup_policy: config.dedup_policy,
            session_check: config.session_check,
            auth_wait: Duration::from_secs(config.auth_wait_secs),
            idle_timeout: Duration::from_secs(config.session_idle_secs),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            page_delay_ms: omnimap_core::MIN_PAGE_DELAY_MS,
            dedup_policy: DedupPolicy::default(),
            session_check: SessionCheckPolicy::default(),
            auth_wait: Duration::from_secs(120),
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct SessionDeps {
    pub places: Arc<dyn PlacesProvider>,
    pub gateway: Arc<dyn MessagingGateway>,
    pub accounts: Arc<dyn AccountDirectory>,
    pub settings: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AnchorInput {
    Link { url: String },
    Pin { lat: f64, lng: f64 },
}

/// Per-search parameters; the anchor comes from the session's list.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub text: String,
    pub radius_meters: u32,
    #[serde(default)]
    pub category: Option<String>,
    pub target_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnchorOutcome {
    pub anchor_id: String,
    #[serde(flatten)]
    pub outcome: SearchOutcome,
    /// Records actually kept after the dedup policy.
    pub appended: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub anchors: Vec<AnchorOutcome>,
    pub appended: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichReport {
    pub total: usize,
    pub with_phone: usize,
    pub with_website: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacesPage {
    pub items: Vec<EnrichedPlaceRecord>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub phase: Phase,
    pub anchors: usize,
    pub places: usize,
    pub enriched: bool,
    pub gateway_linked: bool,
    pub dedup_policy: DedupPolicy,
}

pub struct Session {
    id: Uuid,
    deps: SessionDeps,
    gate: PhaseGate,
    anchors: Mutex<AnchorList>,
    places: Mutex<ResultAggregator>,
    enriched: AtomicBool,
    gateway_token: Mutex<Option<String>>,
    cancel: CancelHandle,
    last_touched: Mutex<Instant>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    #[must_use]
    pub fn new(deps: SessionDeps) -> Self {
        let (cancel, _) = cancel_pair();
        let places = ResultAggregator::new(deps.settings.dedup_policy);
        Self {
            id: Uuid::new_v4(),
            deps,
            gate: PhaseGate::default(),
            anchors: Mutex::new(AnchorList::new()),
            places: Mutex::new(places),
            enriched: AtomicBool::new(false),
            gateway_token: Mutex::new(None),
            cancel,
            last_touched: Mutex::new(Instant::now()),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.gate.current()
    }

    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        let places = lock(&self.places);
        SessionSummary {
            id: self.id,
            phase: self.gate.current(),
            anchors: lock(&self.anchors).len(),
            places: places.len(),
            enriched: self.enriched.load(Ordering::SeqCst),
            gateway_linked: lock(&self.gateway_token).is_some(),
            dedup_policy: places.dedup_policy(),
        }
    }

    /// Marks the session as used now.
    pub fn touch(&self) {
        *lock(&self.last_touched) = Instant::now();
    }

    /// Time since the session was last looked up.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        lock(&self.last_touched).elapsed()
    }

    /// Stops any in-flight stage. The session is unusable for new stages
    /// afterwards; the registry drops it.
    pub fn cancel(&self) {
        tracing::info!(session_id = %self.id, phase = %self.gate.current(), "session cancelled");
        self.cancel.cancel();
    }

    #[must_use]
    pub fn anchors(&self) -> Vec<Anchor> {
        lock(&self.anchors).as_slice().to_vec()
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Invalid`] for a link without coordinates or a
    /// position off the globe.
    pub fn add_anchor(&self, input: AnchorInput) -> Result<Anchor, SessionError> {
        let anchor = match input {
            AnchorInput::Link { url } => Anchor::from_link(&url)?,
            AnchorInput::Pin { lat, lng } => Anchor::from_pin(lat, lng)?,
        };
        tracing::debug!(session_id = %self.id, anchor = %anchor.location_param(), "anchor added");
        Ok(lock(&self.anchors).insert(anchor).clone())
    }

    /// # Errors
    ///
    /// Returns [`SessionError::AnchorNotFound`] for an unknown id.
    pub fn remove_anchor(&self, id: &str) -> Result<Anchor, SessionError> {
        lock(&self.anchors)
            .remove(id)
            .ok_or_else(|| SessionError::AnchorNotFound(id.to_owned()))
    }

    /// Drops anchors repeating an earlier anchor's coordinates. Returns how
    /// many were removed.
    pub fn dedupe_anchors(&self) -> usize {
        lock(&self.anchors).dedupe()
    }

    pub fn clear_anchors(&self) {
        lock(&self.anchors).clear();
    }

    #[must_use]
    pub fn places_page(&self, page: usize) -> PlacesPage {
        let places = lock(&self.places);
        let view = places.page(page);
        PlacesPage {
            items: view.items.to_vec(),
            page: view.page,
            total_pages: view.total_pages,
            total_items: view.total_items,
        }
    }

    /// # Errors
    ///
    /// - [`SessionError::Busy`] while a stage runs; indices would shift under it.
    /// - [`SessionError::PlaceNotFound`] for an index past the end.
    pub fn remove_place(&self, index: usize) -> Result<EnrichedPlaceRecord, SessionError> {
        let phase = self.gate.current();
        if phase.is_busy() {
            return Err(SessionError::Busy { phase });
        }
        lock(&self.places)
            .remove(index)
            .ok_or(SessionError::PlaceNotFound(index))
    }

    /// Searches every anchor in list order, one after another, appending
    /// each batch as it arrives.
    ///
    /// Provider failures end that anchor's search early and show up in its
    /// [`AnchorOutcome`]; they are not errors.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Busy`] if another stage is running.
    /// - [`SessionError::NoAnchors`] with an empty anchor list.
    /// - [`SessionError::Invalid`] if the parameters are out of bounds.
    /// - [`SessionError::Cancelled`] if the session was closed mid-search.
    pub async fn search(&self, params: SearchParams) -> Result<SearchReport, SessionError> {
        let guard = self.gate.enter(Phase::Searching)?;

        let anchors = self.anchors();
        if anchors.is_empty() {
            return Err(SessionError::NoAnchors);
        }
        let queries = anchors
            .into_iter()
            .map(|anchor| {
                SearchQuery::new(
                    &params.text,
                    anchor,
                    params.radius_meters,
                    params.category.as_deref(),
                    params.target_count,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let options =
            CursorOptions::new(self.deps.settings.page_delay_ms).with_cancel(self.cancel.signal());
        let mut outcomes = Vec::with_capacity(queries.len());
        let mut appended_total = 0usize;

        for query in queries {
            let anchor_id = query.anchor.id.clone();
            let mut cursor = SearchCursor::new(&*self.deps.places, query, options.clone());
            let mut appended = 0usize;
            while let Some(batch) = cursor.next_batch().await {
                appended += lock(&self.places).append(batch);
            }
            appended_total += appended;

            let Some(outcome) = cursor.outcome() else {
                continue;
            };
            tracing::info!(
                session_id = %self.id,
                anchor_id = %anchor_id,
                pages = outcome.pages,
                records = outcome.records,
                appended,
                end = ?outcome.end,
                "anchor search finished"
            );
            let cancelled = outcome.end == CursorEnd::Cancelled;
            outcomes.push(AnchorOutcome {
                anchor_id,
                outcome,
                appended,
            });
            if cancelled {
                return Err(SessionError::Cancelled);
            }
        }

        let total = lock(&self.places).len();
        guard.complete(Phase::Aggregated);
        Ok(SearchReport {
            anchors: outcomes,
            appended: appended_total,
            total,
        })
    }

    /// Looks up contact details for every aggregated place.
    ///
    /// # Errors
    ///
    /// - [`SessionError::SignInRequired`] without a signed-in viewer.
    /// - [`SessionError::UpgradeRequired`] for a viewer without a paid plan.
    /// - [`SessionError::Busy`], [`SessionError::NoPlaces`],
    ///   [`SessionError::Cancelled`].
    pub async fn enrich(&self, viewer: Option<&str>) -> Result<EnrichReport, SessionError> {
        let email = viewer.ok_or(SessionError::SignInRequired)?;
        if !self.deps.accounts.is_paid(email).await? {
            tracing::info!(session_id = %self.id, "enrichment refused: unpaid account");
            return Err(SessionError::UpgradeRequired);
        }

        let guard = self.gate.enter(Phase::Enriching)?;
        let records = lock(&self.places).records().to_vec();
        if records.is_empty() {
            return Err(SessionError::NoPlaces);
        }

        let enriched = EnrichmentCoordinator::new(&*self.deps.places)
            .with_cancel(self.cancel.signal())
            .enrich(records)
            .await;
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        let report = EnrichReport {
            total: enriched.len(),
            with_phone: enriched.iter().filter(|r| r.recipient().is_some()).count(),
            with_website: enriched.iter().filter(|r| r.website.is_some()).count(),
        };
        if !lock(&self.places).replace_enriched(enriched) {
            return Err(SessionError::Conflict("enrichment"));
        }
        self.enriched.store(true, Ordering::SeqCst);
        guard.complete(Phase::Enriched);
        Ok(report)
    }

    /// Mints a gateway session and returns its QR code. The gateway session
    /// id is kept for later dispatches.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Gateway`] if the gateway call fails.
    pub async fn link_gateway(&self) -> Result<QrCode, SessionError> {
        let qr = self.deps.gateway.generate_qr().await?;
        *lock(&self.gateway_token) = Some(qr.session_id.clone());
        tracing::info!(session_id = %self.id, "gateway QR code issued");
        Ok(qr)
    }

    /// Waits for the user to scan the QR code.
    ///
    /// # Errors
    ///
    /// - [`SessionError::GatewayNotLinked`] before [`Session::link_gateway`].
    /// - [`SessionError::Gateway`] on stream failure or timeout.
    /// - [`SessionError::Cancelled`] if the session was closed meanwhile.
    pub async fn wait_for_gateway(&self) -> Result<AuthStatus, SessionError> {
        let token = self.gateway_token()?;
        let signal = self.cancel.signal();
        let wait = self
            .deps
            .gateway
            .wait_for_authentication(&token, self.deps.settings.auth_wait);
        match signal.run(wait).await {
            Some(status) => Ok(status?),
            None => Err(SessionError::Cancelled),
        }
    }

    /// # Errors
    ///
    /// [`SessionError::GatewayNotLinked`] or [`SessionError::Gateway`].
    pub async fn gateway_contacts(&self) -> Result<Vec<serde_json::Value>, SessionError> {
        let token = self.gateway_token()?;
        Ok(self.deps.gateway.contacts(&token).await?)
    }

    /// Sends `message` to every enriched place with a phone number.
    ///
    /// # Errors
    ///
    /// - [`SessionError::SignInRequired`] without a signed-in viewer.
    /// - [`SessionError::NotEnriched`] before the first enrichment run.
    /// - [`SessionError::Invalid`] for a blank message.
    /// - [`SessionError::GatewaySessionInvalid`] when the session check
    ///   fails under the blocking policy.
    /// - [`SessionError::Busy`].
    pub async fn dispatch(
        &self,
        viewer: Option<&str>,
        message: &str,
    ) -> Result<DispatchReport, SessionError> {
        viewer.ok_or(SessionError::SignInRequired)?;
        if !self.enriched.load(Ordering::SeqCst) {
            return Err(SessionError::NotEnriched);
        }

        let guard = self.gate.enter(Phase::Dispatching)?;
        let records = lock(&self.places).records().to_vec();
        let token = lock(&self.gateway_token).clone();

        let report = DispatchGate::new(&*self.deps.gateway, self.deps.settings.session_check)
            .with_cancel(self.cancel.signal())
            .dispatch(&records, message, token.as_deref())
            .await
            .map_err(|e| match e {
                DispatchError::Invalid(core) => SessionError::Invalid(core),
                DispatchError::SessionInvalid => SessionError::GatewaySessionInvalid,
            })?;
        if report.cancelled {
            return Err(SessionError::Cancelled);
        }

        guard.complete(Phase::Idle);
        Ok(report)
    }

    fn gateway_token(&self) -> Result<String, SessionError> {
        lock(&self.gateway_token)
            .clone()
            .ok_or(SessionError::GatewayNotLinked)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
