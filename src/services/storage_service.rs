//! src/services/storage_service.rs
//!
//! The storage adapter: the only place the gateway talks to the object store.
//! `ObjectStorage` is the seam the use cases depend on; `S3Storage` is the
//! production implementation on top of `aws-sdk-s3`. Every call is a plain
//! future, so dropping the request future (client gone, timeout hit) aborts the
//! in-flight listing or signing call.

use crate::{
    config::S3Settings,
    models::{collection::ObjectCollection, object::StoredObject},
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    operation::get_object::GetObjectError,
    presigning::PresigningConfig,
};
use chrono::{DateTime, Utc};
use std::{fmt, pin::Pin, time::Duration};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("listing bucket `{bucket}` failed: {message}")]
    List { bucket: String, message: String },
    #[error("presigning `{key}` failed: {message}")]
    Presign { key: String, message: String },
    #[error("fetching `{key}` failed: {message}")]
    Fetch { key: String, message: String },
    #[error("object `{0}` not found in storage")]
    NotFound(String),
    #[error("invalid storage configuration: {0}")]
    Config(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// An open object body plus the headers worth forwarding.
pub struct ObjectBody {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

/// Operations the gateway needs from the object store.
///
/// Implementations are shared across request tasks as `Arc<dyn ObjectStorage>`
/// and must be internally thread-safe.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Recursive listing of the whole bucket, in store emission order.
    async fn list_objects(&self) -> StorageResult<ObjectCollection>;

    /// Presigned GET URL for `key`, valid for `ttl`, rendering inline.
    async fn presign(&self, key: &str, ttl: Duration) -> StorageResult<String>;

    /// Open `key` for streaming.
    async fn open_object(&self, key: &str) -> StorageResult<ObjectBody>;

    /// Configured endpoint authority, `host[:port]`.
    fn endpoint(&self) -> &str;

    fn bucket(&self) -> &str;
}

/// `ObjectStorage` backed by an S3-compatible service.
#[derive(Clone, Debug)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    endpoint: String,
}

impl S3Storage {
    /// Build the client from settings. No request is made here; a bad
    /// endpoint is caught by parsing it up front.
    pub fn connect(settings: &S3Settings) -> StorageResult<Self> {
        if settings.bucket.is_empty() {
            return Err(StorageError::Config("bucket name is empty".into()));
        }
        let scheme = if settings.secure { "https" } else { "http" };
        let endpoint_url = format!("{}://{}", scheme, settings.endpoint);
        url::Url::parse(&endpoint_url).map_err(|err| {
            StorageError::Config(format!("endpoint `{}`: {}", settings.endpoint, err))
        })?;

        let credentials = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "s3-gateway",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(settings.region.clone()))
            .endpoint_url(&endpoint_url)
            .force_path_style(settings.path_style)
            .build();

        debug!(
            "S3 client configured for {} (bucket {}, path style {})",
            endpoint_url, settings.bucket, settings.path_style
        );

        Ok(Self {
            client: Client::from_conf(config),
            bucket: settings.bucket.clone(),
            endpoint: settings.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    /// Walk every ListObjectsV2 page. A failed page aborts the whole listing
    /// instead of returning a partial snapshot.
    async fn list_objects(&self) -> StorageResult<ObjectCollection> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| StorageError::List {
                bucket: self.bucket.clone(),
                message: DisplayErrorContext(&err).to_string(),
            })?;
            for entry in page.contents() {
                let Some(key) = entry.key() else {
                    continue;
                };
                if key.is_empty() {
                    continue;
                }
                objects.push(StoredObject {
                    key: key.to_string(),
                    size: entry.size().unwrap_or(0).max(0) as u64,
                    last_modified: entry.last_modified().and_then(to_chrono),
                    etag: entry.e_tag().map(unquote),
                    content_type: None,
                });
            }
        }

        debug!("listed {} objects from {}", objects.len(), self.bucket);
        Ok(ObjectCollection::from(objects))
    }

    async fn presign(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let presign_err = |message: String| StorageError::Presign {
            key: key.to_string(),
            message,
        };
        let config = PresigningConfig::expires_in(ttl).map_err(|err| presign_err(err.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition("inline")
            .presigned(config)
            .await
            .map_err(|err| presign_err(DisplayErrorContext(&err).to_string()))?;

        Ok(request.uri().to_string())
    }

    async fn open_object(&self, key: &str) -> StorageResult<ObjectBody> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key)
                {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Fetch {
                        key: key.to_string(),
                        message: DisplayErrorContext(&err).to_string(),
                    }
                }
            })?;

        let content_type = output.content_type().map(str::to_string);
        let content_length = output
            .content_length()
            .and_then(|len| u64::try_from(len).ok());
        let etag = output.e_tag().map(unquote);
        let last_modified = output.last_modified().and_then(to_chrono);

        Ok(ObjectBody {
            content_type,
            content_length,
            etag,
            last_modified,
            reader: Box::pin(output.body.into_async_read()),
        })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

fn unquote(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}
