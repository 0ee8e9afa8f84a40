//! HTTP API

use crate::AppState;
use crate::ws;
use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use stackdeck_core::Service;
use stackdeck_registry::{LifecycleAction, RegistryError};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/services", get(list_services))
        .route("/api/services/{name}/status", get(service_status))
        .route("/api/services/{name}/logs", get(service_logs))
        .route("/api/services/{name}/{action}", post(lifecycle))
        .route("/ws", get(ws::upgrade))
        .route("/healthz", get(healthz))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Registry(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UnknownAction(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

async fn list_services(State(state): State<AppState>) -> Json<Vec<Service>> {
    Json(state.manager.list().await)
}

async fn service_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Service>, ApiError> {
    Ok(Json(state.manager.status(&name).await?))
}

async fn lifecycle(
    State(state): State<AppState>,
    Path((name, action)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let action: LifecycleAction = action
        .parse()
        .map_err(|_| ApiError::UnknownAction(action.clone()))?;

    state.manager.run(action, &name).await?;
    Ok(Json(json!({
        "message": format!("Service {} {}", name, action.past_tense())
    })))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    lines: Option<String>,
}

/// 数値として読めない値はデフォルトに戻す
fn log_lines(query: &LogsQuery, default: usize) -> usize {
    query
        .lines
        .as_deref()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

async fn service_logs(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let lines = log_lines(&query, state.default_log_lines);
    let logs = state.manager.logs(&name, lines).await?;
    Ok(Json(json!({ "logs": logs })))
}

async fn healthz() -> &'static str {
    "ok"
}
