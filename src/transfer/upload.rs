//! Local file to object storage

use super::progress::{Direction, ProgressObserver, TransferJob};
use super::TransferError;
use crate::storage::ObjectStorage;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

pub(super) async fn upload_from(
    storage: &dyn ObjectStorage,
    path: &Path,
    key: &str,
    observer: Option<Arc<dyn ProgressObserver>>,
) -> Result<String, TransferError> {
    let file = File::open(path).await.map_err(TransferError::io(path))?;
    let size = file
        .metadata()
        .await
        .map_err(TransferError::io(path))?
        .len();

    // Fresh unguessable token per object
    let token = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        path = %path.display(),
        key,
        bucket = storage.bucket(),
        total_bytes = size,
        "Starting upload"
    );

    let mut job = TransferJob::new(
        Direction::Upload,
        path.display().to_string(),
        key,
        Some(size),
    );
    let body = ReaderStream::new(file).map(move |chunk| {
        if let Ok(bytes) = &chunk {
            if job.record(bytes.len()) {
                if let Some(observer) = &observer {
                    observer.on_progress(&job);
                }
            }
        }
        chunk
    });

    storage.put_object(key, Box::pin(body), size, &token).await?;

    tracing::info!(key, "Upload complete");
    Ok(storage.download_url(key, &token))
}
