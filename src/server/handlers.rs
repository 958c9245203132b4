/*!
 * Route handlers for the control API
 */

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::errors::ApiError;
use crate::orchestrator::RunOutcome;
use crate::quality::{AssessmentResult, TranslationRecord};

/// Largest batch accepted by `POST /api/check/batch`
pub const MAX_BATCH_SIZE: usize = 50;

/// Entries returned by `GET /api/history` without `limit`
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

type ApiResult<T> = Result<Json<T>, ApiError>;

fn rejected(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn uptime_secs(state: &AppState) -> u64 {
    state.started_at.elapsed().as_secs()
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let orchestrator = &state.orchestrator;
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "uptime": uptime_secs(&state),
        "stats": {
            "assessor": orchestrator.assessor().stats(),
            "orchestrator": orchestrator.stats(),
            "running": orchestrator.is_running(),
        },
        "scheduler": state.scheduler.status(),
        "config": state.config.redacted(),
    }))
}

pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    let orchestrator = &state.orchestrator;
    let assessor = orchestrator.assessor();
    Json(json!({
        "success": true,
        "server": {
            "uptime": uptime_secs(&state),
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.server.environment.to_string(),
        },
        "orchestrator": {
            "running": orchestrator.is_running(),
            "historyEntries": orchestrator.history_len(),
            "stats": orchestrator.stats(),
        },
        "assessor": {
            "provider": assessor.provider_name(),
            "model": assessor.model(),
            "successRate": assessor.stats().success_rate(),
            "stats": assessor.stats(),
        },
        "scheduler": state.scheduler.status(),
    }))
}

pub async fn manual_check(State(state): State<AppState>) -> Json<RunOutcome> {
    info!("Manual quality check requested");
    Json(state.orchestrator.run_quality_check().await)
}

#[derive(Debug, Deserialize)]
pub struct SingleCheckRequest {
    pub english: Option<String>,
    pub sinhala: Option<String>,
    pub tamil: Option<String>,
    pub context: Option<String>,
}

impl SingleCheckRequest {
    /// Names of required fields that are absent or empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("english", &self.english),
            ("sinhala", &self.sinhala),
            ("tamil", &self.tamil),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }
}

pub async fn single_check(
    State(state): State<AppState>,
    payload: Result<Json<SingleCheckRequest>, JsonRejection>,
) -> ApiResult<AssessmentResult> {
    let Json(request) = payload.map_err(rejected)?;

    let missing = request.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!("Missing required fields: {}", missing.join(", "))));
    }

    let result = state
        .orchestrator
        .assessor()
        .assess(
            request.english.as_deref().unwrap_or_default(),
            request.sinhala.as_deref().unwrap_or_default(),
            request.tamil.as_deref().unwrap_or_default(),
            request.context.as_deref(),
        )
        .await;
    Ok(Json(result))
}

/// Validate a batch body and decode its records
pub fn parse_batch(body: &Value) -> Result<Vec<TranslationRecord>, ApiError> {
    let items = body
        .get("translations")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::BadRequest("translations must be an array".to_string()))?;

    if items.is_empty() {
        return Err(ApiError::BadRequest("translations array must not be empty".to_string()));
    }
    if items.len() > MAX_BATCH_SIZE {
        return Err(ApiError::BadRequest(format!(
            "Maximum {} translations per batch (got {})",
            MAX_BATCH_SIZE,
            items.len()
        )));
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            TranslationRecord::deserialize(item)
                .map_err(|e| ApiError::BadRequest(format!("Invalid translation at index {}: {}", index, e)))
        })
        .collect()
}

pub async fn batch_check(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload.map_err(rejected)?;
    let records = parse_batch(&body)?;

    info!("Batch check requested for {} translation(s)", records.len());
    let results = state.orchestrator.assessor().assess_batch(records).await;

    Ok(Json(json!({
        "success": true,
        "count": results.len(),
        "results": results,
    })))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub async fn history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    let history = state.orchestrator.history(limit);
    Ok(Json(json!({
        "success": true,
        "count": history.len(),
        "history": history,
    })))
}

pub async fn schedule(State(state): State<AppState>, Path(action): Path<String>) -> ApiResult<Value> {
    let scheduler = &state.scheduler;
    let message = match action.as_str() {
        "start" => {
            if scheduler.start() {
                "Scheduler started"
            } else {
                "Scheduler already running"
            }
        }
        "stop" => {
            if scheduler.stop() {
                "Scheduler stopped"
            } else {
                "Scheduler was not running"
            }
        }
        other => {
            return Err(ApiError::BadRequest(format!(
                "Unknown action '{}', expected 'start' or 'stop'",
                other
            )));
        }
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "status": scheduler.status(),
    })))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
