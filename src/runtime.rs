//! Runtime for executing conversations
//!
//! One task per conversation identity, fed through an `mpsc` channel, so each
//! identity's messages are applied in order while identities run concurrently.

mod executor;
pub mod pipeline;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;
pub use pipeline::UploadPipeline;
pub use traits::*;

use crate::session::SessionStore;
use crate::state_machine::{ConversationId, Event};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// How long a conversation runtime waits for input before shutting down
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Manager for all conversation runtimes
pub struct RuntimeManager {
    sessions: Arc<dyn SessionStore>,
    transport: Arc<dyn ChatTransport>,
    pipeline: Arc<UploadPipeline>,
    runtimes: Arc<Mutex<HashMap<ConversationId, ConversationHandle>>>,
    idle_timeout: Duration,
}

/// Handle to interact with a running conversation
#[derive(Clone)]
pub struct ConversationHandle {
    pub event_tx: mpsc::Sender<Event>,
    /// Cancelled once the runtime has drained its queue and left the map
    stopped: CancellationToken,
}

impl RuntimeManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        transport: Arc<dyn ChatTransport>,
        pipeline: Arc<UploadPipeline>,
    ) -> Self {
        Self {
            sessions,
            transport,
            pipeline,
            runtimes: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = idle;
        self
    }

    /// Number of conversations with an upload session in progress
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Number of conversation runtimes currently alive
    pub async fn active_runtimes(&self) -> usize {
        self.runtimes.lock().await.len()
    }

    /// Handle of a running conversation, starting one if `event` needs it.
    ///
    /// Free text for a conversation with neither a runtime nor a session can
    /// only be ignored, so it gets no runtime.
    async fn handle_for(
        &self,
        conversation_id: ConversationId,
        event: &Event,
    ) -> Option<ConversationHandle> {
        let mut runtimes = self.runtimes.lock().await;
        if let Some(handle) = runtimes.get(&conversation_id) {
            return Some(handle.clone());
        }

        if matches!(event, Event::Text(_)) && self.sessions.get(conversation_id).is_none() {
            return None;
        }

        let handle = self.spawn_runtime(conversation_id);
        runtimes.insert(conversation_id, handle.clone());
        Some(handle)
    }

    fn spawn_runtime(&self, conversation_id: ConversationId) -> ConversationHandle {
        let (event_tx, event_rx) = mpsc::channel(32);
        let stopped = CancellationToken::new();
        let runtime = ConversationRuntime::new(
            conversation_id,
            self.sessions.clone(),
            self.transport.clone(),
            self.pipeline.clone(),
            event_rx,
        )
        .with_idle_timeout(self.idle_timeout);

        let runtimes = self.runtimes.clone();
        let done = stopped.clone();
        tokio::spawn(async move {
            runtime.run().await;
            // No entry is inserted for this id while ours is still present
            runtimes.lock().await.remove(&conversation_id);
            done.cancel();
            tracing::debug!(conversation = %conversation_id, "Conversation runtime finished");
        });

        ConversationHandle { event_tx, stopped }
    }

    /// Send an event to a conversation
    pub async fn send_event(&self, conversation_id: ConversationId, mut event: Event) {
        loop {
            let Some(handle) = self.handle_for(conversation_id, &event).await else {
                tracing::trace!(conversation = %conversation_id, "Text without session dropped");
                return;
            };

            match handle.event_tx.send(event).await {
                Ok(()) => return,
                // The runtime went idle between lookup and send. Wait until it
                // has applied everything queued before it, then start over.
                Err(mpsc::error::SendError(returned)) => {
                    handle.stopped.cancelled().await;
                    event = returned;
                }
            }
        }
    }

    /// Route an inbound text message to its conversation
    pub async fn dispatch(&self, conversation_id: ConversationId, text: &str) {
        self.send_event(conversation_id, Event::from_text(text)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;
    use crate::state_machine::effect::{IMAGE_LINK_PROMPT, TITLE_PROMPT, VIDEO_LINK_PROMPT};
    use testing::{MockChatTransport, MockMediaStore, MockTransferEngine};

    fn manager(transport: Arc<MockChatTransport>, work_dir: &std::path::Path) -> RuntimeManager {
        let pipeline = Arc::new(UploadPipeline::new(
            Arc::new(MockTransferEngine::new("bucket")),
            Arc::new(MockMediaStore::new()),
            transport.clone(),
            work_dir,
            "videos",
        ));
        RuntimeManager::new(Arc::new(InMemorySessionStore::new()), transport, pipeline)
    }

    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockChatTransport::new());
        let manager = manager(transport.clone(), dir.path());
        let alice = ConversationId(1);
        let bob = ConversationId(2);

        manager.dispatch(alice, "/upload").await;
        manager.dispatch(bob, "/upload").await;
        manager.dispatch(alice, "alice's clip").await;

        transport.wait_for_messages(3).await;
        assert_eq!(transport.messages_to(alice), vec![TITLE_PROMPT, VIDEO_LINK_PROMPT]);
        assert_eq!(transport.messages_to(bob), vec![TITLE_PROMPT]);
        assert_eq!(manager.active_sessions(), 2);
    }

    #[tokio::test]
    async fn test_same_conversation_reuses_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(Arc::new(MockChatTransport::new()), dir.path());
        let id = ConversationId(5);

        let first = manager.handle_for(id, &Event::Start).await.unwrap();
        let second = manager.handle_for(id, &Event::Start).await.unwrap();

        assert!(first.event_tx.same_channel(&second.event_tx));
        assert_eq!(manager.active_runtimes().await, 1);
    }

    #[tokio::test]
    async fn test_text_from_unknown_chats_starts_no_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockChatTransport::new());
        let manager = manager(transport.clone(), dir.path());

        for id in 0..1000 {
            manager.dispatch(ConversationId(id), "hello").await;
        }

        assert_eq!(manager.active_runtimes().await, 0);
        assert_eq!(manager.active_sessions(), 0);
        assert!(transport.messages().is_empty());
    }

    #[tokio::test]
    async fn test_idle_runtimes_are_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockChatTransport::new());
        let manager =
            manager(transport.clone(), dir.path()).with_idle_timeout(Duration::from_millis(20));
        let id = ConversationId(6);

        manager.dispatch(id, "/upload").await;
        manager.dispatch(id, "demo").await;
        transport.wait_for_messages(2).await;
        wait_for_no_runtimes(&manager).await;

        // The session outlives its runtime and picks up where it stopped
        assert_eq!(manager.active_sessions(), 1);
        manager.dispatch(id, "http://example.com/v.mp4").await;
        transport.wait_for_messages(3).await;
        assert_eq!(
            transport.messages_to(id),
            vec![TITLE_PROMPT, VIDEO_LINK_PROMPT, IMAGE_LINK_PROMPT]
        );
        wait_for_no_runtimes(&manager).await;
    }

    #[tokio::test]
    async fn test_stopped_runtime_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockChatTransport::new());
        let manager =
            manager(transport.clone(), dir.path()).with_idle_timeout(Duration::from_millis(20));
        let id = ConversationId(7);

        let stale = manager.handle_for(id, &Event::Upload).await.unwrap();
        stale.stopped.cancelled().await;
        assert!(stale.event_tx.is_closed());

        manager.dispatch(id, "/upload").await;
        transport.wait_for_messages(1).await;
        assert_eq!(transport.messages_to(id), vec![TITLE_PROMPT]);
    }

    async fn wait_for_no_runtimes(manager: &RuntimeManager) {
        for _ in 0..200 {
            if manager.active_runtimes().await == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("runtimes were never reclaimed");
    }
}
