//! Error types for the Google Sheets client.

use thiserror::Error;

/// Errors that can occur when talking to the Sheets API.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// Failed to authenticate with Google Cloud
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Failed to load service account credentials
    #[error("Failed to load credentials from {path}: {message}")]
    CredentialsError { path: String, message: String },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid configuration or argument (bad range, missing spreadsheet id)
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<gcp_auth::Error> for SheetsError {
    fn from(err: gcp_auth::Error) -> Self {
        SheetsError::AuthenticationError(err.to_string())
    }
}

impl From<serde_json::Error> for SheetsError {
    fn from(err: serde_json::Error) -> Self {
        SheetsError::ParseError(err.to_string())
    }
}
