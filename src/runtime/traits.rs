//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor and pipeline with mock implementations.

use crate::db::{Database, DbError, MediaRecord};
use crate::state_machine::ConversationId;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("chat API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat API {method} failed: {description}")]
    Api { method: String, description: String },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("collection {collection} rejected the record (HTTP {status}): {message}")]
    Rejected {
        collection: String,
        status: u16,
        message: String,
    },
}

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver a text message to a conversation
    async fn send_message(&self, id: ConversationId, text: &str) -> Result<(), TransportError>;
}

/// Append-only metadata store
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Append a record to a collection. Never overwrites existing entries.
    async fn append(&self, collection: &str, record: &MediaRecord) -> Result<(), PersistenceError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send_message(&self, id: ConversationId, text: &str) -> Result<(), TransportError> {
        (**self).send_message(id, text).await
    }
}

#[async_trait]
impl<T: MediaStore + ?Sized> MediaStore for Arc<T> {
    async fn append(&self, collection: &str, record: &MediaRecord) -> Result<(), PersistenceError> {
        (**self).append(collection, record).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use the SQLite [`Database`] as a `MediaStore`
#[derive(Clone)]
pub struct DatabaseMediaStore {
    db: Database,
}

impl DatabaseMediaStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl MediaStore for DatabaseMediaStore {
    async fn append(&self, collection: &str, record: &MediaRecord) -> Result<(), PersistenceError> {
        let id = self.db.append_media(collection, record)?;
        tracing::debug!(collection, id, "Media record stored");
        Ok(())
    }
}

/// Firebase Realtime Database over its REST API.
///
/// `POST <base>/<collection>.json` pushes a child under a generated key.
pub struct RealtimeDatabase {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl RealtimeDatabase {
    pub fn new(client: Client, base_url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            access_token,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/{}.json",
            self.base_url.trim_end_matches('/'),
            collection.trim_matches('/')
        )
    }
}

#[async_trait]
impl MediaStore for RealtimeDatabase {
    async fn append(&self, collection: &str, record: &MediaRecord) -> Result<(), PersistenceError> {
        let url = self.collection_url(collection);
        let mut request = self.client.post(&url).json(record);
        if let Some(token) = &self.access_token {
            request = request.query(&[("auth", token)]);
        }

        let response = request.send().await.map_err(|source| PersistenceError::Http {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Rejected {
                collection: collection.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(collection, "Media record pushed");
        Ok(())
    }
}
