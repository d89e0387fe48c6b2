//! Builds the `/list` payloads from a fresh listing.
//!
//! Folder markers and suspicious keys are dropped before anything is shown.

use crate::{
    models::{
        collection::ObjectCollection,
        listing::{DirectoryView, ListView, ObjectEntry},
        object::StoredObject,
    },
    services::{
        path_guard::encode_key,
        storage_service::{ObjectStorage, StorageResult},
    },
};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct ListingService {
    storage: Arc<dyn ObjectStorage>,
}

impl ListingService {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    async fn visible_objects(&self) -> StorageResult<ObjectCollection> {
        let listing = self.storage.list_objects().await?;
        let visible = listing.filter_folders().filter_suspicious();
        debug!(
            "listing {}: {} of {} objects visible",
            self.storage.bucket(),
            visible.len(),
            listing.len()
        );
        Ok(visible)
    }

    /// Flat `{name, url}` entries in listing order.
    pub async fn list_json(&self, base_url: &str) -> StorageResult<Vec<ObjectEntry>> {
        let visible = self.visible_objects().await?;
        Ok(visible
            .iter()
            .map(|obj| ObjectEntry {
                name: obj.key.clone(),
                url: object_url(base_url, obj),
                display_name: None,
            })
            .collect())
    }

    /// Directory-grouped view model with every label HTML-escaped.
    pub async fn list_view(&self, base_url: &str) -> StorageResult<ListView> {
        let visible = self.visible_objects().await?;
        let directories = visible
            .organize_by_directory()
            .into_iter()
            .map(|group| DirectoryView {
                name: match group.directory {
                    Some(ref dir) => html_escape(dir),
                    None => group.display_name().to_string(),
                },
                file_count: group.count(),
                files: group
                    .files
                    .iter()
                    .map(|obj| ObjectEntry {
                        name: obj.key.clone(),
                        url: object_url(base_url, obj),
                        display_name: Some(html_escape(obj.filename())),
                    })
                    .collect(),
            })
            .collect();
        Ok(ListView { directories })
    }
}

fn object_url(base_url: &str, obj: &StoredObject) -> String {
    format!("{}/{}", base_url, encode_key(&obj.key))
}

/// Escape the five HTML-significant characters.
pub fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&#34;")
        .replace('\'', "&#39;")
}
