//! Mock implementations for testing
//!
//! These mocks enable pipeline and runtime tests without real I/O.

use super::traits::*;
use crate::db::MediaRecord;
use crate::state_machine::ConversationId;
use crate::storage::{resolve_download_url, ByteStream, ObjectStorage, DEFAULT_DOWNLOAD_BASE};
use crate::transfer::{TransferEngine, TransferError};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

// ============================================================================
// Mock Object Storage
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub data: Vec<u8>,
    pub size: u64,
    pub token: String,
}

/// In-memory bucket
pub struct MockObjectStorage {
    bucket: String,
    fail: bool,
    objects: Mutex<Vec<StoredObject>>,
}

impl MockObjectStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            fail: false,
            objects: Mutex::new(Vec::new()),
        }
    }

    /// Reject every write
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(
        &self,
        key: &str,
        mut body: ByteStream,
        size: u64,
        token: &str,
    ) -> Result<(), TransferError> {
        if self.fail {
            return Err(TransferError::Storage {
                key: key.to_string(),
                status: 503,
                message: "injected failure".to_string(),
            });
        }

        let mut data = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(TransferError::io(Path::new(key)))?;
            data.extend_from_slice(&chunk);
        }

        self.objects.lock().unwrap().push(StoredObject {
            key: key.to_string(),
            data,
            size,
            token: token.to_string(),
        });
        Ok(())
    }

    fn download_url(&self, key: &str, token: &str) -> String {
        resolve_download_url(DEFAULT_DOWNLOAD_BASE, &self.bucket, key, token)
    }
}

// ============================================================================
// Mock Transfer Engine
// ============================================================================

/// Transfer engine that writes the source URL as file content and
/// "uploads" by checking the local file exists.
pub struct MockTransferEngine {
    bucket: String,
    failing_downloads: HashSet<String>,
    failing_uploads: HashSet<String>,
    download_gate: Option<Arc<Semaphore>>,
    /// Record of downloads as (url, path)
    pub downloads: Mutex<Vec<(String, PathBuf)>>,
    /// Record of uploads as (path, key)
    pub uploads: Mutex<Vec<(PathBuf, String)>>,
}

impl MockTransferEngine {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            failing_downloads: HashSet::new(),
            failing_uploads: HashSet::new(),
            download_gate: None,
            downloads: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Answer downloads of `url` with HTTP 404
    pub fn with_failing_download(mut self, url: impl Into<String>) -> Self {
        self.failing_downloads.insert(url.into());
        self
    }

    /// Reject uploads under `key`
    pub fn with_failing_upload(mut self, key: impl Into<String>) -> Self {
        self.failing_uploads.insert(key.into());
        self
    }

    /// Hold every download until `gate` has a permit
    pub fn with_download_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.download_gate = Some(gate);
        self
    }

    pub fn recorded_downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn recorded_uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferEngine for MockTransferEngine {
    async fn download_to(&self, url: &str, path: &Path) -> Result<(), TransferError> {
        self.downloads
            .lock()
            .unwrap()
            .push((url.to_string(), path.to_path_buf()));

        if let Some(gate) = &self.download_gate {
            let _permit = gate.acquire().await.unwrap();
        }

        if self.failing_downloads.contains(url) {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: 404,
            });
        }

        tokio::fs::write(path, url.as_bytes())
            .await
            .map_err(TransferError::io(path))
    }

    async fn upload_from(&self, path: &Path, key: &str) -> Result<String, TransferError> {
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_path_buf(), key.to_string()));

        tokio::fs::metadata(path)
            .await
            .map_err(TransferError::io(path))?;

        if self.failing_uploads.contains(key) {
            return Err(TransferError::Storage {
                key: key.to_string(),
                status: 503,
                message: "injected failure".to_string(),
            });
        }

        let token = uuid::Uuid::new_v4().to_string();
        Ok(resolve_download_url(
            DEFAULT_DOWNLOAD_BASE,
            &self.bucket,
            key,
            &token,
        ))
    }
}

// ============================================================================
// Mock Chat Transport
// ============================================================================

/// Records every outgoing message
#[derive(Default)]
pub struct MockChatTransport {
    fail: bool,
    messages: Mutex<Vec<(ConversationId, String)>>,
    sent: Notify,
}

impl MockChatTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record messages but report every send as failed
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<(ConversationId, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn messages_to(&self, id: ConversationId) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, text)| text)
            .collect()
    }

    /// Wait until at least `count` messages were sent, panicking after a few seconds
    pub async fn wait_for_messages(&self, count: usize) -> Vec<(ConversationId, String)> {
        let wait = async {
            loop {
                let notified = self.sent.notified();
                let messages = self.messages();
                if messages.len() >= count {
                    return messages;
                }
                notified.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {count} messages"))
    }
}

#[async_trait]
impl ChatTransport for MockChatTransport {
    async fn send_message(&self, id: ConversationId, text: &str) -> Result<(), TransportError> {
        self.messages.lock().unwrap().push((id, text.to_string()));
        self.sent.notify_waiters();

        if self.fail {
            return Err(TransportError::Api {
                method: "sendMessage".to_string(),
                description: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Mock Media Store
// ============================================================================

#[derive(Default)]
pub struct MockMediaStore {
    fail: bool,
    records: Mutex<Vec<(String, MediaRecord)>>,
}

impl MockMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<(String, MediaRecord)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for MockMediaStore {
    async fn append(&self, collection: &str, record: &MediaRecord) -> Result<(), PersistenceError> {
        if self.fail {
            return Err(PersistenceError::Rejected {
                collection: collection.to_string(),
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        self.records
            .lock()
            .unwrap()
            .push((collection.to_string(), record.clone()));
        Ok(())
    }
}
