//! Session store
//!
//! Owns every in-progress upload session, keyed by conversation identity.

use crate::state_machine::{ConversationId, Session, SessionField, UploadStep};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no upload session for conversation {0}")]
    NotFound(ConversationId),
    #[error("conversation {id} is at step {step:?}, cannot set {field}")]
    OutOfOrder {
        id: ConversationId,
        step: UploadStep,
        field: SessionField,
    },
}

/// Storage for per-conversation upload sessions
pub trait SessionStore: Send + Sync {
    /// Create a fresh session at the title step, replacing any existing one
    fn begin(&self, id: ConversationId);

    /// Snapshot of the current session
    fn get(&self, id: ConversationId) -> Option<Session>;

    /// Store `field` and move to `next`.
    ///
    /// Fails without modifying anything if there is no session or `field`
    /// is not the one collected by the current step.
    fn advance(
        &self,
        id: ConversationId,
        field: SessionField,
        value: String,
        next: UploadStep,
    ) -> Result<(), SessionError>;

    /// Stamp of the current session. Every `begin` issues a new one, so a
    /// restarted session never shares its generation with the one it replaced.
    fn generation(&self, id: ConversationId) -> Option<u64>;

    /// Remove the session only if it is still the given generation
    fn end_generation(&self, id: ConversationId, generation: u64);

    /// Number of live sessions
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Slot {
    generation: u64,
    session: Session,
}

/// Process-wide in-memory session map
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<ConversationId, Slot>>,
    next_generation: AtomicU64,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn begin(&self, id: ConversationId) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(
            id,
            Slot {
                generation,
                session: Session::new(),
            },
        );
        tracing::debug!(conversation = %id, generation, "Upload session started");
    }

    fn get(&self, id: ConversationId) -> Option<Session> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(&id).map(|slot| slot.session.clone())
    }

    fn advance(
        &self,
        id: ConversationId,
        field: SessionField,
        value: String,
        next: UploadStep,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let session = &mut sessions
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?
            .session;

        if session.step.collects() != Some(field) {
            return Err(SessionError::OutOfOrder {
                id,
                step: session.step,
                field,
            });
        }

        session.set_field(field, value);
        session.step = next;
        tracing::debug!(conversation = %id, %field, step = ?next, "Upload session advanced");
        Ok(())
    }

    fn generation(&self, id: ConversationId) -> Option<u64> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(&id).map(|slot| slot.generation)
    }

    fn end_generation(&self, id: ConversationId, generation: u64) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        match sessions.get(&id).map(|slot| slot.generation) {
            Some(current) if current == generation => {
                sessions.remove(&id);
                tracing::debug!(conversation = %id, generation, "Upload session released");
            }
            Some(current) => {
                tracing::debug!(
                    conversation = %id,
                    leased = generation,
                    current,
                    "Session was restarted, keeping it"
                );
            }
            None => {}
        }
    }

    fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

// ============================================================================
// Scoped release
// ============================================================================

/// Holds a session for the duration of a pipeline run and ends it exactly once,
/// either through [`SessionLease::release`] or on drop.
///
/// The lease is bound to the session generation live when it was taken. If the
/// user restarts with `/upload` meanwhile, releasing leaves the new session alone.
pub struct SessionLease {
    store: Arc<dyn SessionStore>,
    id: ConversationId,
    generation: Option<u64>,
    released: bool,
}

impl SessionLease {
    pub fn new(store: Arc<dyn SessionStore>, id: ConversationId) -> Self {
        let generation = store.generation(id);
        Self {
            store,
            id,
            generation,
            released: false,
        }
    }

    pub fn release(mut self) {
        self.end_once();
    }

    fn end_once(&mut self) {
        if !self.released {
            self.released = true;
            if let Some(generation) = self.generation {
                self.store.end_generation(self.id, generation);
            }
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.end_once();
    }
}
