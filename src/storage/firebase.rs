//! Firebase / Google Cloud Storage backend
//!
//! Uses the Cloud Storage JSON API: a streaming media upload followed by a
//! metadata patch that attaches the Firebase download token.

use super::{resolve_download_url, ByteStream, ObjectStorage, DEFAULT_DOWNLOAD_BASE};
use crate::transfer::TransferError;
use async_trait::async_trait;
use reqwest::{header, Body, Client, RequestBuilder, Response};
use serde_json::json;

pub const DEFAULT_API_BASE: &str = "https://storage.googleapis.com";

/// Connection settings for the storage bucket
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    /// JSON API root (e.g. `https://storage.googleapis.com`)
    pub api_base: String,
    /// Prefix of public download URLs
    pub download_base: String,
    /// OAuth bearer token; authentication itself happens outside this service
    pub access_token: Option<String>,
}

impl StorageConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            download_base: DEFAULT_DOWNLOAD_BASE.to_string(),
            access_token: None,
        }
    }
}

pub struct FirebaseStorage {
    client: Client,
    config: StorageConfig,
}

impl FirebaseStorage {
    pub fn new(client: Client, config: StorageConfig) -> Self {
        Self { client, config }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn checked(key: &str, url: &str, result: reqwest::Result<Response>) -> Result<Response, TransferError> {
        let response = result.map_err(|source| TransferError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        tracing::warn!(key, status = status.as_u16(), %message, "Object storage request failed");
        Err(TransferError::Storage {
            key: key.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ObjectStorage for FirebaseStorage {
    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        size: u64,
        token: &str,
    ) -> Result<(), TransferError> {
        let content_type = mime_guess::from_path(key).first_or_octet_stream();

        let upload_url = self.api_url(&format!("/upload/storage/v1/b/{}/o", self.config.bucket));
        let request = self
            .authorized(self.client.post(&upload_url))
            .query(&[("uploadType", "media"), ("name", key)])
            .header(header::CONTENT_TYPE, content_type.essence_str())
            .header(header::CONTENT_LENGTH, size)
            .body(Body::wrap_stream(body));
        Self::checked(key, &upload_url, request.send().await).await?;

        let metadata_url = self.api_url(&format!(
            "/storage/v1/b/{}/o/{}",
            self.config.bucket,
            super::encode_uri_component(key)
        ));
        let request = self
            .authorized(self.client.patch(&metadata_url))
            .json(&json!({
                "metadata": { "firebaseStorageDownloadTokens": token }
            }));
        Self::checked(key, &metadata_url, request.send().await).await?;

        tracing::debug!(key, bucket = %self.config.bucket, %content_type, "Object stored");
        Ok(())
    }

    fn download_url(&self, key: &str, token: &str) -> String {
        resolve_download_url(&self.config.download_base, &self.config.bucket, key, token)
    }
}
