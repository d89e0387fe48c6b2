//! Represents an object (file) as reported by the bucket listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a recursive bucket listing.
///
/// Only `key` and `size` feed the resolver and the folder classifier; the
/// remaining fields are carried through for display and streaming.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Bucket-relative path, `/`-separated. Never empty for listed objects.
    pub key: String,

    /// Size in bytes.
    pub size: u64,

    /// Timestamp when object was last modified, if the store reported one.
    pub last_modified: Option<DateTime<Utc>>,

    /// Entity tag as reported by the store (quotes stripped).
    pub etag: Option<String>,

    /// Content type (MIME type), when the listing carries it.
    pub content_type: Option<String>,
}

impl StoredObject {
    /// Build an entry with just a key and size, as most tests and fakes need.
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
            etag: None,
            content_type: None,
        }
    }

    /// Whether this entry is a directory marker rather than a real file.
    ///
    /// Two conventions are recognised: keys ending in `/`, and zero-byte
    /// objects whose trailing component is empty or has no `.` in it. The
    /// second rule also matches genuine zero-byte extensionless files; see
    /// `is_zero_byte_marker`.
    pub fn is_folder(&self) -> bool {
        if self.key.is_empty() {
            return false;
        }
        if self.key.ends_with('/') {
            return true;
        }
        is_zero_byte_marker(self.size, self.filename())
    }

    /// The trailing path component, or the whole key when there is no `/`.
    pub fn filename(&self) -> &str {
        match self.key.rfind('/') {
            Some(idx) => &self.key[idx + 1..],
            None => &self.key,
        }
    }

    /// Everything before the last `/`, or `None` for keys at the bucket root.
    pub fn directory(&self) -> Option<&str> {
        self.key.rfind('/').map(|idx| &self.key[..idx])
    }

    /// Keys containing `..` or `//` are never served or listed.
    pub fn is_suspicious(&self) -> bool {
        self.key.contains("..") || self.key.contains("//")
    }
}

/// Folder-marker heuristic for objects without a trailing slash.
///
/// A zero-byte object whose filename is empty or lacks a `.` is treated as a
/// directory placeholder.
pub fn is_zero_byte_marker(size: u64, filename: &str) -> bool {
    size == 0 && (filename.is_empty() || !filename.contains('.'))
}
