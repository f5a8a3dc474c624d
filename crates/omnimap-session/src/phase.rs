//! Stage machine and in-flight guard.
//!
//! `Idle → Searching → Aggregated → Enriching → Enriched → Dispatching → Idle`.
//! The three transient phases are exclusive: while one runs, every other
//! stage request is refused. A [`StageGuard`] holds the transient phase and
//! puts the session back where it was if the stage does not complete,
//! whether it failed, was cancelled or unwound.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Searching,
    Aggregated,
    Enriching,
    Enriched,
    Dispatching,
}

impl Phase {
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Phase::Searching | Phase::Enriching | Phase::Dispatching
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Searching => "searching",
            Phase::Aggregated => "aggregated",
            Phase::Enriching => "enriching",
            Phase::Enriched => "enriched",
            Phase::Dispatching => "dispatching",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct PhaseGate {
    phase: Mutex<Phase>,
}

impl Default for PhaseGate {
    fn default() -> Self {
        Self {
            phase: Mutex::new(Phase::Idle),
        }
    }
}

impl PhaseGate {
    #[must_use]
    pub fn current(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.current().is_busy()
    }

    /// Moves into the transient `stage`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Busy`] if another stage is running.
    pub fn enter(&self, stage: Phase) -> Result<StageGuard<'_>, SessionError> {
        debug_assert!(stage.is_busy(), "only transient phases are entered");
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if phase.is_busy() {
            return Err(SessionError::Busy { phase: *phase });
        }
        let previous = std::mem::replace(&mut *phase, stage);
        Ok(StageGuard {
            gate: self,
            previous,
            next: None,
        })
    }

    fn set(&self, next: Phase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Releases the in-flight guard on drop.
#[must_use = "dropping the guard immediately ends the stage"]
pub struct StageGuard<'a> {
    gate: &'a PhaseGate,
    previous: Phase,
    next: Option<Phase>,
}

impl StageGuard<'_> {
    /// Ends the stage successfully, settling on `next`.
    pub fn complete(mut self, next: Phase) {
        self.next = Some(next);
    }

    #[must_use]
    pub fn previous(&self) -> Phase {
        self.previous
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.gate.set(self.next.unwrap_or(self.previous));
    }
}
