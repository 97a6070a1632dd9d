//! Transfer engine
//!
//! Byte-stream copies between a remote URL and a local file, and between a
//! local file and object storage. No retries: any failure aborts the
//! transfer and is returned to the caller unchanged.

mod download;
pub mod progress;
mod upload;

pub use progress::{LogProgress, ProgressObserver};

use crate::storage::ObjectStorage;
use async_trait::async_trait;
use reqwest::Client;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("local file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("object storage rejected {key} (HTTP {status}): {message}")]
    Storage {
        key: String,
        status: u16,
        message: String,
    },
}

impl TransferError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> TransferError + '_ {
        move |source| TransferError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Moves media between remote endpoints and the local disk
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Stream `url` into `path`. Returns only after the file is flushed.
    async fn download_to(&self, url: &str, path: &Path) -> Result<(), TransferError>;

    /// Stream `path` to object storage under `key` and return its public URL
    async fn upload_from(&self, path: &Path, key: &str) -> Result<String, TransferError>;
}

#[async_trait]
impl<T: TransferEngine + ?Sized> TransferEngine for Arc<T> {
    async fn download_to(&self, url: &str, path: &Path) -> Result<(), TransferError> {
        (**self).download_to(url, path).await
    }

    async fn upload_from(&self, path: &Path, key: &str) -> Result<String, TransferError> {
        (**self).upload_from(path, key).await
    }
}

/// HTTP downloads plus uploads through an [`ObjectStorage`] backend
pub struct HttpTransferEngine {
    client: Client,
    storage: Arc<dyn ObjectStorage>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl HttpTransferEngine {
    pub fn new(client: Client, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            client,
            storage,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

#[async_trait]
impl TransferEngine for HttpTransferEngine {
    async fn download_to(&self, url: &str, path: &Path) -> Result<(), TransferError> {
        download::download_to(&self.client, url, path, self.observer.as_deref()).await
    }

    async fn upload_from(&self, path: &Path, key: &str) -> Result<String, TransferError> {
        upload::upload_from(self.storage.as_ref(), path, key, self.observer.clone()).await
    }
}
