//! Upload pipeline
//!
//! Turns a completed session into stored media: download both files, push
//! them to object storage, append the metadata record, clean up, notify the
//! user and release the session. Steps run strictly in that order and the
//! first failure aborts the rest.

use super::traits::{ChatTransport, MediaStore, PersistenceError};
use crate::db::MediaRecord;
use crate::session::SessionLease;
use crate::state_machine::UploadJob;
use crate::transfer::{TransferEngine, TransferError};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const FAILURE_MESSAGE: &str =
    "An error occurred while processing your request. Please try again.";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub struct UploadPipeline {
    transfer: Arc<dyn TransferEngine>,
    media: Arc<dyn MediaStore>,
    transport: Arc<dyn ChatTransport>,
    work_dir: PathBuf,
    collection: String,
}

impl UploadPipeline {
    pub fn new(
        transfer: Arc<dyn TransferEngine>,
        media: Arc<dyn MediaStore>,
        transport: Arc<dyn ChatTransport>,
        work_dir: impl Into<PathBuf>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            transfer,
            media,
            transport,
            work_dir: work_dir.into(),
            collection: collection.into(),
        }
    }

    /// Run the whole pipeline for one job.
    ///
    /// Always removes local files, notifies the conversation and releases
    /// the session, whatever the outcome.
    pub async fn run(&self, job: UploadJob, lease: SessionLease) -> Result<MediaRecord, PipelineError> {
        let id = job.conversation_id;
        let stem = sanitize_title(&job.title);
        let video_path = self.work_dir.join(format!("{id}-{stem}.mp4"));
        let image_path = self.work_dir.join(format!("{id}-{stem}.jpg"));

        tracing::info!(conversation = %id, title = %job.title, "Upload pipeline started");

        let outcome = self
            .transfer_and_record(&job, &stem, &video_path, &image_path)
            .await;

        remove_local(&video_path).await;
        remove_local(&image_path).await;

        let text = match &outcome {
            Ok(record) => {
                tracing::info!(conversation = %id, video_url = %record.video_url, "Upload pipeline finished");
                success_message(record)
            }
            Err(e) => {
                tracing::error!(conversation = %id, error = %e, "Upload pipeline failed");
                FAILURE_MESSAGE.to_string()
            }
        };

        if let Err(e) = self.transport.send_message(id, &text).await {
            tracing::warn!(conversation = %id, error = %e, "Failed to notify conversation");
        }

        lease.release();
        outcome
    }

    async fn transfer_and_record(
        &self,
        job: &UploadJob,
        stem: &str,
        video_path: &Path,
        image_path: &Path,
    ) -> Result<MediaRecord, PipelineError> {
        self.transfer.download_to(&job.video_link, video_path).await?;
        self.transfer.download_to(&job.image_link, image_path).await?;

        let video_url = self
            .transfer
            .upload_from(video_path, &format!("videos/{stem}.mp4"))
            .await?;
        let thumbnail_url = self
            .transfer
            .upload_from(image_path, &format!("thumbnails/{stem}.jpg"))
            .await?;

        let record = MediaRecord {
            title: job.title.clone(),
            video_url,
            thumbnail_url,
        };
        self.media.append(&self.collection, &record).await?;
        Ok(record)
    }
}

fn success_message(record: &MediaRecord) -> String {
    format!(
        "Upload successful!\n\nTitle: {}\nVideo: {}\nImage: {}",
        record.title, record.video_url, record.thumbnail_url
    )
}

/// Remove a temporary file; a file that was never created is fine.
async fn remove_local(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed local file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove local file"),
    }
}

/// Make a title safe to use as a file name and storage key segment
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_start_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}
