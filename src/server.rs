//! Web server module for Gauge.
//!
//! Exposes the HTTP read/write API over the telemetry store.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::query::{self, QueryMode};
use crate::storage::{ScalarValue, StoreError, TelemetryRecord, TelemetryStore};

// =============================================================================
// Constants
// =============================================================================

/// The only (component, parameter) stream remote writes may touch.
const WRITABLE_COMPONENT: &str = "drivecontroller";
const WRITABLE_PARAMETER: &str = "statemachine_state";

/// Valid state machine states.
const STATE_RANGE: std::ops::RangeInclusive<i64> = 0..=3;

/// Fixed fields of the record an accepted state update creates.
const STATE_DISPLAY_NAME: &str = "Statemachine state";
const STATE_CATEGORY: &str = "Drivecontroller";

// =============================================================================
// State and Errors
// =============================================================================

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: TelemetryStore,
}

/// API error kinds, each carrying a stable `error` code in the body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The (component, parameter) pair is not in the stream catalog.
    #[error("unknown component/parameter pair")]
    NotFound,

    /// The `fromWhen` token is not empty, `<int>h`, or `<int>m`.
    #[error("malformed fromWhen token")]
    BadQuery,

    /// The store failed or timed out.
    #[error(transparent)]
    Internal(#[from] StoreError),
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    error: u8,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Codes 1 and 2 ride on a success status; clients dispatch on the
        // `error` field of the body, not on the HTTP status.
        let (status, code, message) = match &self {
            Self::NotFound => (
                StatusCode::OK,
                1,
                "ERROR: The specified component and/or the value do not exist.",
            ),
            Self::BadQuery => (
                StatusCode::OK,
                2,
                "ERROR: The query parameters provided are wrong/incomplete.",
            ),
            Self::Internal(e) => {
                tracing::error!(error = %e, "Store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    3,
                    "ERROR: Internal server error.",
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                message: message.to_string(),
                error: code,
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for the data read endpoint.
#[derive(Debug, Deserialize)]
pub struct DataQueryParams {
    /// Relative-time token: empty for latest, `<int>h`/`<int>m` for a window.
    #[serde(rename = "fromWhen", default)]
    pub from_when: String,
}

/// Envelope for multi-record (window) responses.
#[derive(Debug, Serialize)]
pub struct WindowResponse {
    pub results: Vec<TelemetryRecord>,
}

/// Body of a remote write request.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub component: String,
    pub parameter: String,
    #[serde(rename = "newValue")]
    pub new_value: ScalarValue,
}

/// Body of the liveness and readiness probes.
#[derive(Serialize)]
struct ProbeResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    db: Option<String>,
}

// =============================================================================
// Router
// =============================================================================

/// Assemble the router over the shared state.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/data/{component}/{parameter}", get(data_handler))
        .route("/update_value", post(update_value_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Read endpoint: latest value of a stream, or a relative time window.
async fn data_handler(
    State(state): State<Arc<AppState>>,
    Path((component, parameter)): Path<(String, String)>,
    Query(params): Query<DataQueryParams>,
) -> Result<Response, ApiError> {
    // Existence is checked before the token is parsed: an unknown pair
    // answers NotFound even when fromWhen is also malformed.
    if !state.store.stream_exists(&component, &parameter).await? {
        return Err(ApiError::NotFound);
    }

    let mode = QueryMode::parse(&params.from_when).ok_or(ApiError::BadQuery)?;

    match mode {
        QueryMode::Latest => {
            let record = state
                .store
                .latest(&component, &parameter)
                .await?
                .ok_or(ApiError::NotFound)?;
            Ok(Json(record).into_response())
        }
        QueryMode::Window { unit, magnitude } => {
            let threshold = query::window_threshold(unit, magnitude, chrono::Utc::now());
            let results = state
                .store
                .records_since(&component, &parameter, &threshold)
                .await?;
            Ok(Json(WindowResponse { results }).into_response())
        }
    }
}

/// Write endpoint for the state machine state.
///
/// Only `drivecontroller/statemachine_state` with an integer value in
/// [0,3] is accepted. Everything else is dropped without an error, with
/// a warning in the log.
async fn update_value_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateRequest>,
) -> Result<StatusCode, ApiError> {
    if body.component != WRITABLE_COMPONENT || body.parameter != WRITABLE_PARAMETER {
        tracing::warn!(
            component = %body.component,
            parameter = %body.parameter,
            "Dropping update for non-writable stream"
        );
        return Ok(StatusCode::OK);
    }

    let Some(value) = body
        .new_value
        .as_integer()
        .filter(|v| STATE_RANGE.contains(v))
    else {
        tracing::warn!(
            value = ?body.new_value,
            "Dropping update with non-integer or out-of-range state value"
        );
        return Ok(StatusCode::OK);
    };

    let record = TelemetryRecord::new(
        STATE_DISPLAY_NAME,
        STATE_CATEGORY,
        ScalarValue::Integer(value),
        "",
        query::now_timestamp(),
    );

    state
        .store
        .insert(WRITABLE_COMPONENT, WRITABLE_PARAMETER, &record)
        .await?;

    tracing::info!(state = value, "State machine state updated");
    Ok(StatusCode::OK)
}

/// Liveness probe. Answers as long as the process runs.
async fn healthz_handler() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "ok".to_string(),
        db: None,
    })
}

/// Readiness probe: ready once the store answers queries.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(ProbeResponse {
            status: "ok".to_string(),
            db: Some("ready".to_string()),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Store not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ProbeResponse {
                    status: "not_ready".to_string(),
                    db: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageBuilder;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use serde_json::{Value, json};
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;

    async fn create_test_state() -> (AppState, TempDir) {
        let dir = tempdir().unwrap();

        let handles = StorageBuilder::new(dir.path().join("test_server.db"))
            .pool_size(2)
            .build()
            .await
            .expect("Failed to build storage");

        let state = AppState {
            store: handles.store.clone(),
        };

        // Return dir to keep the tempdir alive
        (state, dir)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> StatusCode {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        response.status()
    }

    fn reading(value: ScalarValue, timestamp: impl Into<String>) -> TelemetryRecord {
        TelemetryRecord::new("Motor current", "Powertrain", value, "A", timestamp)
    }

    #[tokio::test]
    async fn test_latest_returns_newest_record_without_id() {
        let (state, _dir) = create_test_state().await;

        for (value, ts) in [
            (1, "2026-08-25T10:00:00.000000Z"),
            (3, "2026-08-25T10:02:00.000000Z"),
            (2, "2026-08-25T10:01:00.000000Z"),
        ] {
            state
                .store
                .insert(
                    "powertrain",
                    "motor_current",
                    &reading(ScalarValue::Integer(value), ts),
                )
                .await
                .unwrap();
        }

        let app = create_router(state);
        let (status, body) = get(app, "/data/powertrain/motor_current").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], 3);
        assert_eq!(body["timestamp"], "2026-08-25T10:02:00.000000Z");
        assert_eq!(body["displayName"], "Motor current");
        let keys = body.as_object().unwrap();
        assert_eq!(keys.len(), 5);
        assert!(!keys.contains_key("_id"));
    }

    #[tokio::test]
    async fn test_unknown_stream_answers_error_1() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state);

        let (status, body) = get(app, "/data/nope/nothing").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "ERROR: The specified component and/or the value do not exist.",
                "error": 1,
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_token_answers_error_2() {
        let (state, _dir) = create_test_state().await;
        state
            .store
            .insert(
                "powertrain",
                "motor_current",
                &reading(ScalarValue::Integer(1), "2026-08-25T10:00:00.000000Z"),
            )
            .await
            .unwrap();

        let app = create_router(state);
        for token in ["yesterday", "1d", "5", "1.5h"] {
            let (status, body) = get(
                app.clone(),
                &format!("/data/powertrain/motor_current?fromWhen={token}"),
            )
            .await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                body,
                json!({
                    "message": "ERROR: The query parameters provided are wrong/incomplete.",
                    "error": 2,
                }),
                "token {token:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_stream_wins_over_malformed_token() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state);

        let (_, body) = get(app, "/data/nope/nothing?fromWhen=junk").await;
        assert_eq!(body["error"], 1);
    }

    #[tokio::test]
    async fn test_window_returns_results_envelope_ascending() {
        let (state, _dir) = create_test_state().await;
        let now = Utc::now();

        // Two readings inside the last hour, one outside
        for minutes_ago in [30i64, 10, 120] {
            let ts = query::format_timestamp(now - Duration::minutes(minutes_ago));
            state
                .store
                .insert(
                    "powertrain",
                    "motor_current",
                    &reading(ScalarValue::Integer(minutes_ago), ts),
                )
                .await
                .unwrap();
        }

        let app = create_router(state);
        let (status, body) = get(app, "/data/powertrain/motor_current?fromWhen=1h").await;

        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        // Oldest first
        assert_eq!(results[0]["value"], 30);
        assert_eq!(results[1]["value"], 10);
    }

    #[tokio::test]
    async fn test_window_zero_magnitude_is_empty() {
        let (state, _dir) = create_test_state().await;
        state
            .store
            .insert(
                "powertrain",
                "motor_current",
                &reading(
                    ScalarValue::Integer(1),
                    query::format_timestamp(Utc::now() - Duration::minutes(1)),
                ),
            )
            .await
            .unwrap();

        let app = create_router(state);
        let (status, body) = get(app, "/data/powertrain/motor_current?fromWhen=0m").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "results": [] }));
    }

    #[tokio::test]
    async fn test_update_value_accepted_inserts_record() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state.clone());

        let status = post_json(
            app,
            "/update_value",
            json!({
                "component": "drivecontroller",
                "parameter": "statemachine_state",
                "newValue": 2,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let record = state
            .store
            .latest("drivecontroller", "statemachine_state")
            .await
            .unwrap()
            .expect("accepted update must insert a record");
        assert_eq!(record.value, ScalarValue::Integer(2));
        assert_eq!(record.display_name, "Statemachine state");
        assert_eq!(record.category, "Drivecontroller");
        assert_eq!(record.unit, "");

        // Exactly one record, not one per validation step
        let all = state
            .store
            .records_since(
                "drivecontroller",
                "statemachine_state",
                "0000-01-01T00:00:00.000000Z",
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_update_value_silently_drops_invalid_input() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state.clone());

        let bodies = [
            // Out of range
            json!({"component": "drivecontroller", "parameter": "statemachine_state", "newValue": 7}),
            // Wrong stream
            json!({"component": "powertrain", "parameter": "statemachine_state", "newValue": 2}),
            json!({"component": "drivecontroller", "parameter": "motor_current", "newValue": 2}),
            // Float-typed and string-typed values are not integers
            json!({"component": "drivecontroller", "parameter": "statemachine_state", "newValue": 2.0}),
            json!({"component": "drivecontroller", "parameter": "statemachine_state", "newValue": "2"}),
        ];

        for body in bodies {
            let status = post_json(app.clone(), "/update_value", body.clone()).await;
            assert_eq!(status, StatusCode::OK, "body {body}");
        }

        // Nothing was written anywhere
        assert!(
            !state
                .store
                .stream_exists("drivecontroller", "statemachine_state")
                .await
                .unwrap()
        );
        assert!(
            !state
                .store
                .stream_exists("powertrain", "statemachine_state")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_update_value_malformed_body_is_a_client_error() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/update_value")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"component": "drivecontroller"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_health_probes() {
        let (state, _dir) = create_test_state().await;
        let app = create_router(state);

        let (status, body) = get(app.clone(), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get(app, "/readyz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["db"], "ready");
    }
}
