use google_sheets::SheetsError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Transport or API failure from the backing store. Never retried here.
    #[error("Backing store error: {0}")]
    Backend(String),

    /// A post-update re-read did not show the value that was written.
    #[error("Verification failed for {id}: expected {field}={expected}, found {actual}")]
    VerificationFailed {
        id: String,
        field: String,
        expected: String,
        actual: String,
    },

    /// The sheet has a header but no column for a field that must be written.
    #[error("Sheet \"{sheet}\" has no column for field {field}")]
    MissingColumn { sheet: String, field: String },

    /// The header names none of the record's fields, so nothing could be written.
    #[error("Sheet \"{sheet}\" header has no column for any field of the record")]
    NoWritableColumns { sheet: String },

    #[error("Unknown sheet \"{name}\"; expected one of: {expected}")]
    UnknownSheet { name: String, expected: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SheetsError> for StorageError {
    fn from(err: SheetsError) -> Self {
        StorageError::Backend(err.to_string())
    }
}

// Serialized as a plain message for JSON output
impl Serialize for StorageError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
