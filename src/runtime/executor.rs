//! Conversation runtime executor

use super::pipeline::UploadPipeline;
use super::traits::ChatTransport;
use crate::session::{SessionLease, SessionStore};
use crate::state_machine::{transition, ConversationId, Effect, Event};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Applies one conversation's events in arrival order
pub struct ConversationRuntime {
    conversation_id: ConversationId,
    sessions: Arc<dyn SessionStore>,
    transport: Arc<dyn ChatTransport>,
    pipeline: Arc<UploadPipeline>,
    event_rx: mpsc::Receiver<Event>,
    idle_timeout: Option<Duration>,
}

impl ConversationRuntime {
    pub fn new(
        conversation_id: ConversationId,
        sessions: Arc<dyn SessionStore>,
        transport: Arc<dyn ChatTransport>,
        pipeline: Arc<UploadPipeline>,
        event_rx: mpsc::Receiver<Event>,
    ) -> Self {
        Self {
            conversation_id,
            sessions,
            transport,
            pipeline,
            event_rx,
            idle_timeout: None,
        }
    }

    /// Stop after `idle` without events. Senders see a closed channel from
    /// then on; events already queued are still applied before returning.
    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = Some(idle);
        self
    }

    pub async fn run(mut self) {
        tracing::debug!(conversation = %self.conversation_id, "Starting conversation runtime");

        while let Some(event) = self.next_event().await {
            self.process_event(event).await;
        }

        tracing::debug!(conversation = %self.conversation_id, "Conversation runtime stopped");
    }

    async fn next_event(&mut self) -> Option<Event> {
        let Some(idle) = self.idle_timeout else {
            return self.event_rx.recv().await;
        };

        match tokio::time::timeout(idle, self.event_rx.recv()).await {
            Ok(event) => event,
            Err(_) => {
                tracing::debug!(conversation = %self.conversation_id, "Conversation idle, closing");
                self.event_rx.close();
                self.event_rx.recv().await
            }
        }
    }

    async fn process_event(&self, event: Event) {
        let id = self.conversation_id;
        let session = self.sessions.get(id);

        let result = match transition(id, session.as_ref(), event) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(conversation = %id, error = %e, "Transition rejected");
                return;
            }
        };

        if result.is_ignored() {
            tracing::trace!(conversation = %id, "Event ignored");
        }

        for effect in result.effects {
            self.execute_effect(effect).await;
        }
    }

    async fn execute_effect(&self, effect: Effect) {
        let id = self.conversation_id;
        match effect {
            Effect::Reply { text } => {
                if let Err(e) = self.transport.send_message(id, &text).await {
                    tracing::warn!(conversation = %id, error = %e, "Failed to send reply");
                }
            }
            Effect::BeginSession => self.sessions.begin(id),
            Effect::Advance { field, value, next } => {
                if let Err(e) = self.sessions.advance(id, field, value, next) {
                    tracing::warn!(conversation = %id, error = %e, "Session update rejected");
                }
            }
            Effect::StartPipeline { job } => {
                let lease = SessionLease::new(self.sessions.clone(), id);
                let pipeline = self.pipeline.clone();
                tokio::spawn(async move {
                    // Outcome is logged and reported by the pipeline itself
                    let _ = pipeline.run(job, lease).await;
                });
            }
        }
    }
}
