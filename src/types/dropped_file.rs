use serde::{Deserialize, Serialize};

use super::file::extension_of;

/// An uploaded file as seen by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl DroppedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
            uploaded_at: None,
            id: None,
        }
    }

    pub fn uploaded_at(mut self, uploaded_at: impl Into<String>) -> Self {
        self.uploaded_at = Some(uploaded_at.into());
        self
    }

    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }
}

/// Body of `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    pub content: String,
}
