//! Request/Response types for the HTTP server.
//!
//! These types define the wire format for the internal admin endpoints.

use serde::{Deserialize, Serialize};

use crate::repair::SheetRepairReport;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Server status (always "ok" when healthy)
    pub status: String,
    /// Server version from Cargo.toml
    pub version: String,
}

impl HealthResponse {
    /// Create a healthy response with the current package version
    pub fn healthy() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Body of `POST /internal/repair-sheets`.
///
/// Parsed leniently from a raw JSON value: wrong types are ignored and the
/// limit may arrive as a number or a numeric string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairRequest {
    pub apply: bool,
    pub sheet: Option<String>,
    pub limit: Option<f64>,
}

impl RepairRequest {
    /// Anything that is not a JSON object (including invalid JSON) is `{}`.
    pub fn from_body(body: &[u8]) -> Self {
        let value: serde_json::Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(_) => return Self::default(),
        };
        Self {
            apply: value
                .get("apply")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
            sheet: value
                .get("sheet")
                .and_then(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            limit: value.get("limit").and_then(parse_limit_value),
        }
    }
}

fn parse_limit_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_limit(s),
        _ => None,
    }
}

/// Parse a limit from a query string or string body field.
pub fn parse_limit(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Query string of `GET /internal/repair-sheets`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepairQuery {
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    /// Shared secret, lowest-priority source
    #[serde(default)]
    pub key: Option<String>,
}

/// Successful repair run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairResponse {
    pub ok: bool,
    pub apply: bool,
    /// Requested sheet, `null` when all sheets ran
    pub sheet: Option<String>,
    /// Effective limit after clamping
    pub limit: usize,
    pub summaries: Vec<SheetRepairReport>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Optional error code for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with just a message
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    /// Create a new error response with a message and code
    pub fn with_code(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod health_response {
        use super::*;

        #[test]
        fn healthy_returns_ok_status() {
            let response = HealthResponse::healthy();
            assert_eq!(response.status, "ok");
            assert!(!response.version.is_empty());
        }
    }

    mod repair_request {
        use super::*;

        #[test]
        fn empty_body_is_default() {
            assert_eq!(RepairRequest::from_body(b""), RepairRequest::default());
        }

        #[test]
        fn invalid_json_is_default() {
            assert_eq!(
                RepairRequest::from_body(b"{not json"),
                RepairRequest::default()
            );
        }

        #[test]
        fn non_object_is_default() {
            assert_eq!(RepairRequest::from_body(b"[1,2]"), RepairRequest::default());
        }

        #[test]
        fn parses_all_fields() {
            let req = RepairRequest::from_body(br#"{"apply":true,"sheet":" tasks ","limit":25}"#);
            assert!(req.apply);
            assert_eq!(req.sheet.as_deref(), Some("tasks"));
            assert_eq!(req.limit, Some(25.0));
        }

        #[test]
        fn limit_as_string() {
            let req = RepairRequest::from_body(br#"{"limit":"7"}"#);
            assert_eq!(req.limit, Some(7.0));
        }

        #[test]
        fn wrong_types_ignored() {
            let req = RepairRequest::from_body(br#"{"apply":"yes","sheet":3,"limit":"lots"}"#);
            assert_eq!(req, RepairRequest::default());
        }
    }

    mod error_response {
        use super::*;

        #[test]
        fn new_creates_without_code() {
            let err = ErrorResponse::new("Something went wrong");
            assert_eq!(err.error, "Something went wrong");
            assert!(err.code.is_none());
        }

        #[test]
        fn code_omitted_when_none() {
            let json = serde_json::to_string(&ErrorResponse::new("x")).unwrap();
            assert!(!json.contains("code"));
        }

        #[test]
        fn with_code_serializes() {
            let err = ErrorResponse::with_code("unset", "INTERNAL_API_KEY_UNSET");
            let json = serde_json::to_string(&err).unwrap();
            assert!(json.contains("\"code\":\"INTERNAL_API_KEY_UNSET\""));
        }
    }
}
