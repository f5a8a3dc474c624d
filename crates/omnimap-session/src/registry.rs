use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::SessionError;
use crate::session::{Session, SessionDeps};

/// Live sessions keyed by id. Sessions live in memory only, and one left
/// untouched for longer than the configured idle timeout is closed.
pub struct SessionRegistry {
    deps: SessionDeps,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            deps,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self) -> Arc<Session> {
        self.evict_idle();
        let session = Arc::new(Session::new(self.deps.clone()));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id(), Arc::clone(&session));
        tracing::info!(session_id = %session.id(), "session created");
        session
    }

    /// # Errors
    ///
    /// Returns [`SessionError::SessionNotFound`] for an unknown id.
    pub fn get(&self, id: Uuid) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .inspect(|session| session.touch())
            .ok_or(SessionError::SessionNotFound(id))
    }

    /// Removes the session and cancels whatever it was running.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionNotFound`] for an unknown id.
    pub fn close(&self, id: Uuid) -> Result<(), SessionError> {
        let session = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or(SessionError::SessionNotFound(id))?;
        session.cancel();
        Ok(())
    }

    /// Closes sessions idle past the timeout. A session still held by a
    /// request or running a stage is kept.
    pub fn evict_idle(&self) -> usize {
        let limit = self.deps.settings.idle_timeout;
        let evicted: Vec<Arc<Session>> = {
            let mut sessions = self
                .sessions
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let stale: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, s)| {
                    Arc::strong_count(s) == 1 && !s.phase().is_busy() && s.idle_for() >= limit
                })
                .map(|(id, _)| *id)
                .collect();
            stale.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for session in &evicted {
            session.cancel();
        }
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), "evicted idle sessions");
        }
        evicted.len()
    }

    /// Runs [`SessionRegistry::evict_idle`] every `every` until the registry
    /// is dropped.
    #[must_use]
    pub fn spawn_idle_sweep(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.evict_idle();
            }
        })
    }

    /// Cancels every live session. Called on shutdown.
    pub fn close_all(&self) {
        let drained: Vec<Arc<Session>> = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, s)| s)
            .collect();
        for session in &drained {
            session.cancel();
        }
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "closed live sessions");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
