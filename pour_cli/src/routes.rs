//! HTTP request surface.
//!
//! | route               | reply |
//! |---------------------|-------|
//! | `GET /api/status`   | always 200, device snapshot or offline placeholder |
//! | `POST /api/dispense`| 200 accepted, 400 caller/precondition, 500 transport or device refusal |
//! | `GET /api/logs`     | recent events, newest first |
//! | `GET /api/health`   | liveness plus dropped event count |

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pour_core::{Coordinator, DispenseOutcome, SystemStatus};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub anonymous_token: Arc<str>,
}

#[derive(Debug, Deserialize)]
pub struct DispenseRequest {
    /// Any JSON value; anything but a whole number is rejected by the coordinator.
    #[serde(default)]
    pub amount_ml: Option<Value>,
    #[serde(default)]
    pub user_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Unparseable values fall back to the default limit.
    #[serde(default, deserialize_with = "lenient_limit")]
    pub limit: Option<i64>,
}

fn lenient_limit<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

/// Whole millilitres, or the raw text when the value is not one.
/// A missing amount reads as 0.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn whole_ml(value: Option<&Value>) -> Result<i64, String> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => {
            if let Some(ml) = n.as_i64() {
                return Ok(ml);
            }
            match n.as_f64() {
                Some(f) if f.trunc() == f && (-9.0e18..=9.0e18).contains(&f) => Ok(f as i64),
                _ => Err(n.to_string()),
            }
        }
        Some(Value::String(s)) => Err(s.clone()),
        Some(other) => Err(other.to_string()),
    }
}

pub fn router(state: AppState, server: &pour_config::Server) -> Router {
    let mut app = Router::new()
        .route("/api/status", get(status))
        .route("/api/dispense", post(dispense))
        .route("/api/logs", get(logs))
        .route("/api/health", get(health))
        .with_state(state);

    if let Some(dir) = &server.static_dir {
        tracing::info!(dir = %dir.display(), "serving static frontend");
        app = app.fallback_service(ServeDir::new(dir));
    }
    if server.cors {
        app = app.layer(CorsLayer::permissive());
    }
    app.layer(TraceLayer::new_for_http())
}

fn failure(code: StatusCode, reason: impl Into<String>) -> Response {
    let body = json!({ "success": false, "reason": reason.into() });
    (code, Json(body)).into_response()
}

async fn status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(state.coordinator.query_status().await)
}

async fn dispense(
    State(state): State<AppState>,
    payload: Result<Json<DispenseRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "malformed dispense request");
            return failure(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };
    let token = req
        .user_token
        .unwrap_or_else(|| state.anonymous_token.to_string());

    let outcome = match whole_ml(req.amount_ml.as_ref()) {
        Ok(ml) => state.coordinator.request_dispense(ml, &token).await,
        Err(raw) => {
            state
                .coordinator
                .request_dispense_unparsed(&raw, &token)
                .await
        }
    };
    match outcome {
        DispenseOutcome::Accepted { .. } => Json(json!({
            "success": true,
            "message": "Dispense started",
        }))
        .into_response(),
        DispenseOutcome::Rejected(e) => {
            let code = if e.kind().is_server_side() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::BAD_REQUEST
            };
            failure(code, e.reason())
        }
    }
}

async fn logs(State(state): State<AppState>, Query(q): Query<LogsQuery>) -> Response {
    match state.coordinator.recent_events(q.limit).await {
        Ok(events) => Json(events).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "event log read failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Event log unavailable")
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "dropped_events": state.coordinator.dropped_events(),
    }))
}
