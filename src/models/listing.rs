//! Response and view models for the listing endpoint.

use serde::Serialize;

/// One listed file.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full object key.
    pub name: String,

    /// Gateway URL that resolves to this object.
    pub url: String,

    /// HTML-escaped filename, only present in the HTML view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// JSON body of `GET /list`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ListResponse {
    pub error: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub list: Vec<ObjectEntry>,
}

impl ListResponse {
    pub fn ok(list: Vec<ObjectEntry>) -> Self {
        Self {
            error: false,
            message: None,
            list,
        }
    }
}

/// A directory section of the HTML listing. All strings are already escaped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryView {
    pub name: String,
    pub file_count: usize,
    pub files: Vec<ObjectEntry>,
}

/// View model handed to the HTML renderer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListView {
    pub directories: Vec<DirectoryView>,
}
