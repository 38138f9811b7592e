use crate::config::types::{CompatResponse, ExecutionRequest, ExecutionResult, Language};
use crate::http::error::ApiError;
use crate::http::state::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of the per-language routes.
#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
    #[serde(default)]
    pub stdin: Option<String>,
}

/// Body of `/api/execute`.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub stdin: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
    pub timestamp: String,
    pub environment: String,
}

async fn run_compat(
    state: &AppState,
    language: Language,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<CompatResponse>, ApiError> {
    let Json(body) = payload?;
    let request = ExecutionRequest {
        language,
        source: body.code,
        stdin: body.stdin,
    };
    let result = state.execute(request).await?;
    Ok(Json(result.compat_view()))
}

pub async fn run_java(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<CompatResponse>, ApiError> {
    run_compat(&state, Language::Java, payload).await
}

pub async fn run_cpp(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<CompatResponse>, ApiError> {
    run_compat(&state, Language::Cpp, payload).await
}

pub async fn run_js(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<CompatResponse>, ApiError> {
    run_compat(&state, Language::JavaScript, payload).await
}

pub async fn run_python(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<CompatResponse>, ApiError> {
    run_compat(&state, Language::Python, payload).await
}

pub async fn execute_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let Json(body) = payload?;
    let language: Language = body.language.parse()?;
    let request = ExecutionRequest {
        language,
        source: body.code,
        stdin: body.stdin,
    };
    Ok(Json(state.execute(request).await?))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Server is running".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: state.config.environment.clone(),
    })
}

pub async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to AlgoSync API" }))
}
