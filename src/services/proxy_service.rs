//! Serves a single object request: screen the path, resolve it to a key, then
//! either presign a redirect target or open the body for streaming.

use crate::{
    errors::GatewayError,
    services::{
        path_guard::{decode_path, is_suspicious},
        redirect_guard,
        resolver::Resolver,
        storage_service::{ObjectBody, ObjectStorage},
    },
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, warn};

const DEFAULT_EXPIRY_MINUTES: u32 = 60;

#[derive(Clone)]
pub struct ProxyService {
    storage: Arc<dyn ObjectStorage>,
    resolver: Resolver,
    expiry: Duration,
}

impl ProxyService {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            resolver: Resolver::new(storage.clone()),
            storage,
            expiry: minutes(DEFAULT_EXPIRY_MINUTES),
        }
    }

    /// Set the presigned URL lifetime. Zero keeps the current value.
    pub fn with_expiry_minutes(mut self, expiry_minutes: u32) -> Self {
        if expiry_minutes > 0 {
            self.expiry = minutes(expiry_minutes);
        }
        self
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Screen and resolve `raw_path` to a canonical key.
    ///
    /// Suspicious paths are rejected before storage is touched.
    pub async fn locate(&self, raw_path: &str) -> Result<String, GatewayError> {
        if is_suspicious(raw_path) {
            warn!("rejected suspicious path: {}", raw_path);
            return Err(GatewayError::SuspiciousPath(raw_path.to_string()));
        }

        let object_path = decode_path(raw_path).unwrap_or_else(|err| {
            warn!("failed to decode {}: {}", raw_path, err);
            raw_path.to_string()
        });

        if is_suspicious(&object_path) {
            warn!("rejected suspicious decoded path: {}", object_path);
            return Err(GatewayError::SuspiciousPath(object_path));
        }

        // the resolver decodes once more, so screen that form too
        if let Ok(twice) = decode_path(&object_path) {
            if is_suspicious(&twice) {
                warn!("rejected double-encoded suspicious path: {}", raw_path);
                return Err(GatewayError::SuspiciousPath(twice));
            }
        }

        if raw_path.is_empty() || object_path.is_empty() {
            return Err(GatewayError::ObjectNotFound);
        }

        debug!("request for {} (decoded from {})", object_path, raw_path);

        match self.resolver.resolve(&object_path).await {
            Ok(Some(found)) => Ok(found.key),
            Ok(None) => {
                warn!("object not found: {}", object_path);
                Err(GatewayError::ObjectNotFound)
            }
            Err(err) => {
                error!("error finding object {}: {}", object_path, err);
                Err(err.into())
            }
        }
    }

    /// Full redirect flow: locate, presign, then check the URL stays on the
    /// configured endpoint.
    pub async fn presigned_url(&self, raw_path: &str) -> Result<String, GatewayError> {
        let key = self.locate(raw_path).await?;

        let presigned = self
            .storage
            .presign(&key, self.expiry)
            .await
            .inspect_err(|err| error!("failed to presign {}: {}", key, err))?;

        redirect_guard::validate(&presigned, self.storage.endpoint())
            .inspect_err(|err| error!("refusing redirect for {}: {}", key, err))?;

        Ok(presigned)
    }

    /// Streaming flow: locate, then open the object body.
    pub async fn open(&self, raw_path: &str) -> Result<(String, ObjectBody), GatewayError> {
        let key = self.locate(raw_path).await?;
        let body = self
            .storage
            .open_object(&key)
            .await
            .inspect_err(|err| error!("failed to open {}: {}", key, err))?;
        Ok((key, body))
    }
}

fn minutes(m: u32) -> Duration {
    Duration::from_secs(u64::from(m) * 60)
}
