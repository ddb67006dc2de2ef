use serde::{Deserialize, Serialize};

/// Body of every response to an upload attempt.
///
/// Both fields are optional on the wire: a body without `success` is read as a
/// failure, and a missing `error` falls back to a generic message on the page.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    /// The server supplied message, ignoring empty strings.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|error| !error.is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub name: String,
    pub filename: String,
    #[serde(default)]
    pub description: String,
    pub size: usize,
    pub uploaded_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoredDataFile {
    pub id: String,
    #[serde(flatten)]
    pub file: DataFile,
}
