//! Object storage abstraction
//!
//! Objects are written under a key together with an access token; the
//! public URL is derived from bucket, key and token:
//! `<download base>/<bucket>/o/<encoded key>?alt=media&token=<token>`.

mod firebase;

pub use firebase::{FirebaseStorage, StorageConfig};

use crate::transfer::TransferError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::io;
use std::pin::Pin;

/// Default prefix of publicly resolvable download URLs
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://firebasestorage.googleapis.com/v0/b";

/// Object body as a stream of chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync + 'static>>;

/// Remote object storage
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Bucket the objects are written to
    fn bucket(&self) -> &str;

    /// Write `body` (exactly `size` bytes) under `key`, readable with `token`
    async fn put_object(
        &self,
        key: &str,
        body: ByteStream,
        size: u64,
        token: &str,
    ) -> Result<(), TransferError>;

    /// Public URL of an object written with `token`
    fn download_url(&self, key: &str, token: &str) -> String;
}

/// Build the public URL for an object
pub fn resolve_download_url(base: &str, bucket: &str, key: &str, token: &str) -> String {
    format!(
        "{}/{}/o/{}?alt=media&token={}",
        base.trim_end_matches('/'),
        bucket,
        encode_uri_component(key),
        encode_uri_component(token),
    )
}

/// Everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode one path or query component of an object URL
pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}
