//! Telegram Bot API transport
//!
//! Long-polls `getUpdates` and feeds text messages to the runtime manager;
//! replies go out through `sendMessage`.

use crate::runtime::{ChatTransport, RuntimeManager, TransportError};
use crate::state_machine::ConversationId;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Pause after a failed poll before trying again
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(1);

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

// ============================================================================
// Client
// ============================================================================

pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(client: Client, api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim_end_matches('/'),
            self.token,
            method
        )
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, TransportError>
    where
        P: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response: ApiResponse<R> = self
            .client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await?
            .json()
            .await?;

        match response {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(TransportError::Api {
                method: method.to_string(),
                description: description.unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }

    /// Fetch pending updates, waiting up to `timeout_secs` for new ones
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: timeout_secs,
                allowed_updates: ["message"],
            },
        )
        .await
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_message(&self, id: ConversationId, text: &str) -> Result<(), TransportError> {
        let _: serde_json::Value = self
            .call("sendMessage", &SendMessage { chat_id: id.0, text })
            .await?;
        Ok(())
    }
}

// ============================================================================
// Polling loop
// ============================================================================

/// Pulls updates and routes them to per-conversation runtimes
pub struct Poller {
    client: Arc<TelegramClient>,
    manager: Arc<RuntimeManager>,
    timeout_secs: u64,
    offset: Option<i64>,
}

impl Poller {
    pub fn new(client: Arc<TelegramClient>, manager: Arc<RuntimeManager>, timeout_secs: u64) -> Self {
        Self {
            client,
            manager,
            timeout_secs,
            offset: None,
        }
    }

    /// Run one `getUpdates` round. Returns the number of dispatched messages.
    pub async fn poll_once(&mut self) -> Result<usize, TransportError> {
        let updates = self.client.get_updates(self.offset, self.timeout_secs).await?;
        let mut dispatched = 0;

        for update in updates {
            self.offset = Some(update.update_id + 1);

            let Some(Message {
                chat,
                text: Some(text),
            }) = update.message
            else {
                tracing::debug!(update_id = update.update_id, "Skipping non-text update");
                continue;
            };

            let id = ConversationId(chat.id);
            self.manager.dispatch(id, &text).await;
            dispatched += 1;
        }

        Ok(dispatched)
    }

    /// Poll forever
    pub async fn run(mut self) {
        tracing::info!(timeout_secs = self.timeout_secs, "Polling for updates");
        loop {
            if let Err(e) = self.poll_once().await {
                tracing::warn!(error = %e, "Polling failed");
                tokio::time::sleep(POLL_ERROR_BACKOFF).await;
            }
        }
    }
}
