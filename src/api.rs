//! HTTP API for the Commission Engine.
//!
//! This module exposes a minimal REST API around the commission engine
//! using the [`axum`](https://crates.io/crates/axum) framework.  Clients
//! can compute a single rep, submit a whole run, and read or replace
//! the active settings snapshot.  Every computation works on the
//! snapshot that was current when the request arrived.

use crate::attribution::Diagnostics;
use crate::engine::CommissionEngine;
use crate::error::{CommissionError, SettingsError};
use crate::models::{CommissionResult, Period};
use crate::run::{compute_rep, run_commissions, RepInput, RunInput, RunResult};
use crate::settings::{load_settings_from_file, CommissionSettings};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Application state shared across requests.
pub struct AppState {
    pub settings: RwLock<Arc<CommissionSettings>>,
    pub engine: Arc<CommissionEngine>,
}

impl AppState {
    pub fn new(settings: CommissionSettings) -> Self {
        Self {
            settings: RwLock::new(Arc::new(settings)),
            engine: Arc::new(CommissionEngine::default()),
        }
    }

    async fn snapshot(&self) -> Arc<CommissionSettings> {
        self.settings.read().await.clone()
    }
}

/// Request body for a single-rep calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateRequest {
    pub period: Period,
    #[serde(flatten)]
    pub rep: RepInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub result: CommissionResult,
    pub diagnostics: Diagnostics,
}

/// Errors surfaced to HTTP clients.
#[derive(Debug)]
pub enum ApiError {
    Commission(CommissionError),
    Settings(SettingsError),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Commission(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            ApiError::Settings(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<CommissionError> for ApiError {
    fn from(value: CommissionError) -> Self {
        Self::Commission(value)
    }
}

impl From<SettingsError> for ApiError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

/// Build the API router around an existing settings snapshot.
pub fn router(settings: CommissionSettings) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(settings));
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/commissions/calculate", post(calculate_handler))
        .route("/api/commissions/run", post(run_handler))
        .route("/api/settings", get(get_settings_handler).put(put_settings_handler))
        .with_state(state.clone());
    (router, state)
}

/// Load the settings snapshot from `settings_path`.  A missing file is
/// not fatal: the service starts with empty tables and every
/// computation that needs one reports it as missing.
pub fn load_initial_settings(settings_path: &Path) -> Result<CommissionSettings> {
    if !settings_path.exists() {
        warn!(
            path = %settings_path.display(),
            "settings file not found; starting without rule tables"
        );
        return Ok(CommissionSettings::default());
    }
    load_settings_from_file(settings_path)
        .with_context(|| format!("loading settings from {}", settings_path.display()))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Handler for POST /api/commissions/calculate
async fn calculate_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<CalculateRequest>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let settings = app_state.snapshot().await;
    let engine = app_state.engine.clone();
    let (result, diagnostics) = tokio::task::spawn_blocking(move || {
        compute_rep(request.rep, &request.period, &settings, &engine)
    })
    .await
    .map_err(|err| ApiError::Internal(format!("commission calculation aborted: {err}")))?;
    let result = result?;
    Ok(Json(CalculateResponse {
        result,
        diagnostics,
    }))
}

/// Handler for POST /api/commissions/run
async fn run_handler(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<RunInput>,
) -> Result<Json<RunResult>, ApiError> {
    let settings = app_state.snapshot().await;
    let engine = app_state.engine.clone();
    let result = tokio::task::spawn_blocking(move || run_commissions(input, &settings, &engine))
        .await
        .map_err(|err| ApiError::Internal(format!("commission run aborted: {err}")))?;
    Ok(Json(result))
}

async fn get_settings_handler(State(app_state): State<Arc<AppState>>) -> Json<CommissionSettings> {
    let settings = app_state.snapshot().await;
    Json(settings.as_ref().clone())
}

/// Handler for PUT /api/settings.  The new snapshot only replaces the
/// old one if it validates.
async fn put_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Json(settings): Json<CommissionSettings>,
) -> Result<Json<CommissionSettings>, ApiError> {
    settings.validate()?;
    *app_state.settings.write().await = Arc::new(settings.clone());
    info!("commission settings replaced");
    Ok(Json(settings))
}

/// Launch the API server.  This function loads the settings snapshot,
/// binds to `addr` and serves until the process is interrupted.
pub async fn serve(addr: SocketAddr, settings_path: &Path) -> Result<()> {
    let settings = load_initial_settings(settings_path)?;
    let (app, _state) = router(settings);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "commission engine listening");
    axum::serve(listener, app).await?;
    Ok(())
}
