//! HTTP request handlers for the internal admin server.
//!
//! Every `/internal/*` handler authenticates against the shared secret
//! before touching the store.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use tokio_util::sync::CancellationToken;

use super::types::*;
use crate::error::StorageError;
use crate::repair::RepairOptions;
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// State shared across all handlers
pub struct ServerState {
    /// Store, column cache and sheet names
    pub app: AppState,
    /// Shared secret for `/internal/*`; `None` refuses every request
    pub internal_api_key: Option<String>,
    /// Shutdown token for graceful server shutdown
    pub shutdown_token: CancellationToken,
}

impl ServerState {
    pub fn new(app: AppState, internal_api_key: Option<String>) -> (Arc<Self>, CancellationToken) {
        let shutdown_token = CancellationToken::new();
        let state = Arc::new(Self {
            app,
            internal_api_key: internal_api_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            shutdown_token: shutdown_token.clone(),
        });
        (state, shutdown_token)
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check endpoint.
///
/// ```json
/// { "status": "ok", "version": "0.1.0" }
/// ```
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// =============================================================================
// Authentication
// =============================================================================

/// Token from `Authorization: Bearer`, then `x-internal-api-key`, then `?key=`.
fn presented_token<'a>(headers: &'a HeaderMap, query_key: Option<&'a str>) -> Option<&'a str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let v = v.trim();
            match v.get(..7) {
                Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => Some(v[7..].trim()),
                _ => None,
            }
        })
        .filter(|t| !t.is_empty());

    bearer
        .or_else(|| {
            headers
                .get("x-internal-api-key")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|t| !t.is_empty())
        })
        .or_else(|| query_key.map(str::trim).filter(|t| !t.is_empty()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn authorize(state: &ServerState, headers: &HeaderMap, query_key: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = state.internal_api_key.as_deref() else {
        tracing::error!("internal endpoint called but no internal API key is configured");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::with_code(
                "Internal API key is not configured",
                "INTERNAL_API_KEY_UNSET",
            )),
        ));
    };

    match presented_token(headers, query_key) {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => {
            tracing::warn!("rejected internal request with missing or wrong key");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::with_code("Unauthorized", "UNAUTHORIZED")),
            ))
        }
    }
}

// =============================================================================
// Sheet Repair
// =============================================================================

/// Run a repair pass.
///
/// # Request Body
///
/// ```json
/// { "apply": true, "sheet": "tasks", "limit": 500 }
/// ```
///
/// Every field is optional; a body that is not valid JSON counts as `{}`.
///
/// # Response
///
/// - `200 OK`: `{ ok, apply, sheet, limit, summaries }`
/// - `400 Bad Request`: Unknown sheet name
/// - `401 Unauthorized`: Missing or wrong key
/// - `500 Internal Server Error`: No key configured
/// - `502 Bad Gateway`: The backing store failed
pub async fn repair_sheets(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RepairQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RepairResponse>, ApiError> {
    authorize(&state, &headers, query.key.as_deref())?;
    let request = RepairRequest::from_body(&body);
    run_repair(&state, request).await
}

/// Dry-run variant over the query string: `?sheet=&limit=&key=`.
pub async fn repair_sheets_dry_run(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RepairQuery>,
    headers: HeaderMap,
) -> Result<Json<RepairResponse>, ApiError> {
    authorize(&state, &headers, query.key.as_deref())?;
    let request = RepairRequest {
        apply: false,
        sheet: query
            .sheet
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        limit: query.limit.as_deref().and_then(parse_limit),
    };
    run_repair(&state, request).await
}

async fn run_repair(state: &ServerState, request: RepairRequest) -> Result<Json<RepairResponse>, ApiError> {
    let options = RepairOptions {
        apply: request.apply,
        sheet: request.sheet.clone(),
        limit: state.app.repair_limit(request.limit),
    };

    tracing::info!(
        apply = options.apply,
        sheet = options.sheet.as_deref().unwrap_or("<all>"),
        limit = options.limit,
        "repair requested"
    );

    match state.app.repair_engine().run(&options).await {
        Ok(summaries) => Ok(Json(RepairResponse {
            ok: true,
            apply: options.apply,
            sheet: options.sheet,
            limit: options.limit,
            summaries,
        })),
        Err(e @ StorageError::UnknownSheet { .. }) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::with_code(e.to_string(), "UNKNOWN_SHEET")),
        )),
        Err(e) => {
            tracing::error!("repair failed: {}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::with_code(e.to_string(), "BACKEND_ERROR")),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    use crate::state::SheetNames;

    fn app_with_key(key: Option<&str>) -> (Router, AppState) {
        let app = AppState::in_memory(SheetNames::default());
        let (state, _) = ServerState::new(app.clone(), key.map(str::to_string));
        let router = Router::new()
            .route("/health", get(health))
            .route(
                "/internal/repair-sheets",
                post(repair_sheets).get(repair_sheets_dry_run),
            )
            .with_state(state);
        (router, app)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    mod auth {
        use super::*;

        #[test]
        fn bearer_wins_over_header_and_query() {
            let mut headers = HeaderMap::new();
            headers.insert(header::AUTHORIZATION, "Bearer first".parse().unwrap());
            headers.insert("x-internal-api-key", "second".parse().unwrap());
            assert_eq!(presented_token(&headers, Some("third")), Some("first"));
        }

        #[test]
        fn header_wins_over_query() {
            let mut headers = HeaderMap::new();
            headers.insert("x-internal-api-key", "second".parse().unwrap());
            assert_eq!(presented_token(&headers, Some("third")), Some("second"));
        }

        #[test]
        fn bearer_scheme_is_case_insensitive() {
            let mut headers = HeaderMap::new();
            headers.insert(header::AUTHORIZATION, "bearer tok".parse().unwrap());
            assert_eq!(presented_token(&headers, None), Some("tok"));
        }

        #[test]
        fn non_bearer_authorization_falls_through() {
            let mut headers = HeaderMap::new();
            headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
            assert_eq!(presented_token(&headers, Some("q")), Some("q"));
        }

        #[test]
        fn constant_time_eq_compares_content_and_length() {
            assert!(constant_time_eq(b"secret", b"secret"));
            assert!(!constant_time_eq(b"secret", b"secreT"));
            assert!(!constant_time_eq(b"secret", b"secrets"));
        }
    }

    mod endpoints {
        use super::*;

        #[tokio::test]
        async fn health_returns_ok() {
            let (router, _) = app_with_key(Some("secret"));
            let response = router
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await["status"], "ok");
        }

        #[tokio::test]
        async fn missing_key_config_is_500() {
            let (router, _) = app_with_key(None);
            let response = router
                .oneshot(
                    Request::builder()
                        .uri("/internal/repair-sheets?key=anything")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body_json(response).await["code"], "INTERNAL_API_KEY_UNSET");
        }

        #[tokio::test]
        async fn whitespace_only_key_config_is_500() {
            let (router, _) = app_with_key(Some("   "));
            let response = router
                .oneshot(
                    Request::builder()
                        .uri("/internal/repair-sheets")
                        .header("x-internal-api-key", "   ")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body_json(response).await["code"], "INTERNAL_API_KEY_UNSET");
        }

        #[tokio::test]
        async fn configured_key_is_trimmed() {
            let (router, _) = app_with_key(Some(" secret\n"));
            let response = router
                .oneshot(
                    Request::builder()
                        .uri("/internal/repair-sheets")
                        .header(header::AUTHORIZATION, "Bearer secret")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn wrong_key_is_401() {
            let (router, _) = app_with_key(Some("secret"));
            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/internal/repair-sheets")
                        .header("x-internal-api-key", "nope")
                        .body(Body::from("{}"))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        #[tokio::test]
        async fn get_is_dry_run_over_all_sheets() {
            let (router, _) = app_with_key(Some("secret"));
            let response = router
                .oneshot(
                    Request::builder()
                        .uri("/internal/repair-sheets?key=secret&limit=10")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = body_json(response).await;
            assert_eq!(json["ok"], true);
            assert_eq!(json["apply"], false);
            assert_eq!(json["limit"], 10);
            assert!(json["sheet"].is_null());
            assert_eq!(json["summaries"].as_array().unwrap().len(), 4);
        }

        #[tokio::test]
        async fn post_invalid_json_treated_as_empty() {
            let (router, _) = app_with_key(Some("secret"));
            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/internal/repair-sheets")
                        .header(header::AUTHORIZATION, "Bearer secret")
                        .body(Body::from("not json"))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = body_json(response).await;
            assert_eq!(json["apply"], false);
            assert_eq!(json["limit"], 1000);
        }

        #[tokio::test]
        async fn post_apply_repairs_drifted_row() {
            let (router, app) = app_with_key(Some("secret"));
            // Row written before a "notes" column was inserted after description
            app.store
                .update_row(
                    "tasks",
                    1,
                    vec![
                        "id", "goalId", "description", "notes", "status", "dueDate", "priority",
                        "assignedAt", "sourceLogId",
                    ]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                )
                .await
                .unwrap();
            app.store
                .append_row(
                    "tasks",
                    vec!["t_1", "g_1", "walk", "todo", "", "B", "2024-01-01", ""]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                )
                .await
                .unwrap();

            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/internal/repair-sheets")
                        .header(header::AUTHORIZATION, "Bearer secret")
                        .body(Body::from(r#"{"apply":true,"sheet":"tasks"}"#))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = body_json(response).await;
            assert_eq!(json["sheet"], "tasks");
            assert_eq!(json["summaries"][0]["repaired"], 1);

            let todos = app.tasks().list_todos().await.unwrap();
            assert_eq!(todos.len(), 1);
            assert_eq!(todos[0].record.priority, "B");
        }

        #[tokio::test]
        async fn unknown_sheet_is_400() {
            let (router, _) = app_with_key(Some("secret"));
            let response = router
                .oneshot(
                    Request::builder()
                        .uri("/internal/repair-sheets?key=secret&sheet=nope")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["code"], "UNKNOWN_SHEET");
        }
    }
}
