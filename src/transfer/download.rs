//! Remote URL to local file

use super::progress::{Direction, ProgressObserver, TransferJob};
use super::TransferError;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub(super) async fn download_to(
    client: &Client,
    url: &str,
    path: &Path,
    observer: Option<&dyn ProgressObserver>,
) -> Result<(), TransferError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| TransferError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(url, status = status.as_u16(), "Download rejected");
        return Err(TransferError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut job = TransferJob::new(
        Direction::Download,
        url,
        path.display().to_string(),
        response.content_length(),
    );
    tracing::info!(url, path = %path.display(), total_bytes = ?job.total, "Starting download");

    let mut file = File::create(path).await.map_err(TransferError::io(path))?;
    let written = write_body(response, &mut file, path, &mut job, observer).await;
    drop(file);

    if let Err(e) = written {
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %remove_err, "Failed to remove partial download");
        }
        return Err(e);
    }

    tracing::info!(url, bytes = job.transferred, "Download complete");
    Ok(())
}

async fn write_body(
    response: reqwest::Response,
    file: &mut File,
    path: &Path,
    job: &mut TransferJob,
    observer: Option<&dyn ProgressObserver>,
) -> Result<(), TransferError> {
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| TransferError::Http {
            url: job.source.clone(),
            source,
        })?;
        file.write_all(&chunk)
            .await
            .map_err(TransferError::io(path))?;

        if job.record(chunk.len()) {
            if let Some(observer) = observer {
                observer.on_progress(job);
            }
        }
    }

    file.flush().await.map_err(TransferError::io(path))?;
    file.sync_all().await.map_err(TransferError::io(path))?;
    Ok(())
}
