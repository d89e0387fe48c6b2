//! In-memory `ObjectStorage` used by unit and router tests.

use crate::{
    models::{collection::ObjectCollection, object::StoredObject},
    services::storage_service::{ObjectBody, ObjectStorage, StorageError, StorageResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::HashMap,
    io::Cursor,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

/// What `list_objects` does instead of answering.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum ListFault {
    #[default]
    None,
    Fail,
    Hang,
    Panic,
}

/// Sets its flag when the owning future is dropped.
struct DropFlag<'a>(&'a AtomicBool);

impl Drop for DropFlag<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Vec<StoredObject>,
    bodies: HashMap<String, (Bytes, Option<&'static str>)>,
    endpoint: String,
    bucket: String,
    presign_host: Option<String>,
    list_fault: ListFault,
    list_abandoned: AtomicBool,
    list_calls: AtomicUsize,
    presign_calls: AtomicUsize,
}

impl MemoryStorage {
    pub fn new(objects: Vec<StoredObject>) -> Self {
        Self {
            objects,
            endpoint: "s3.example.net".into(),
            bucket: "media".into(),
            ..Self::default()
        }
    }

    /// Objects of size 1 with the given keys.
    pub fn with_keys(keys: &[&str]) -> Self {
        Self::new(keys.iter().map(|k| StoredObject::new(*k, 1)).collect())
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sign URLs onto `host` instead of the endpoint.
    pub fn presigning_onto(mut self, host: &str) -> Self {
        self.presign_host = Some(host.into());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.list_fault = ListFault::Fail;
        self
    }

    /// Listing never completes; see [`MemoryStorage::list_abandoned`].
    pub fn hanging_list(mut self) -> Self {
        self.list_fault = ListFault::Hang;
        self
    }

    pub fn panicking_list(mut self) -> Self {
        self.list_fault = ListFault::Panic;
        self
    }

    /// Body served as `text/plain`.
    pub fn with_body(mut self, key: &str, body: &'static [u8]) -> Self {
        self.bodies
            .insert(key.into(), (Bytes::from_static(body), Some("text/plain")));
        self
    }

    /// Body stored without a content type.
    pub fn with_untyped_body(mut self, key: &str, body: &'static [u8]) -> Self {
        self.bodies.insert(key.into(), (Bytes::from_static(body), None));
        self
    }

    /// Whether a hanging listing was dropped before completing.
    pub fn list_abandoned(&self) -> bool {
        self.list_abandoned.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn presign_calls(&self) -> usize {
        self.presign_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.list_calls() + self.presign_calls()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn list_objects(&self) -> StorageResult<ObjectCollection> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        match self.list_fault {
            ListFault::None => Ok(ObjectCollection::from(self.objects.clone())),
            ListFault::Fail => Err(StorageError::List {
                bucket: self.bucket.clone(),
                message: "connection refused".into(),
            }),
            ListFault::Hang => {
                let _flag = DropFlag(&self.list_abandoned);
                std::future::pending().await
            }
            ListFault::Panic => panic!("listing blew up"),
        }
    }

    async fn presign(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        let host = self.presign_host.as_deref().unwrap_or(&self.endpoint);
        Ok(format!(
            "https://{}/{}/{}?X-Amz-Expires={}&response-content-disposition=inline&X-Amz-Signature=fake",
            host,
            self.bucket,
            key,
            ttl.as_secs()
        ))
    }

    async fn open_object(&self, key: &str) -> StorageResult<ObjectBody> {
        let (body, content_type) = self
            .bodies
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(ObjectBody {
            content_type: content_type.map(str::to_string),
            content_length: Some(body.len() as u64),
            etag: Some("abc123".into()),
            last_modified: None,
            reader: Box::pin(Cursor::new(body)),
        })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
