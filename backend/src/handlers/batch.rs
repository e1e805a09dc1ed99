//! HTTP handlers for manufacturing batches

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{BatchDetail, BatchPipeline, BatchStatus, ManufacturingBatch};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{check_permission, CurrentUser};
use crate::services::CreateBatchInput;
use crate::AppState;

#[derive(Serialize)]
pub struct BatchCreatedResponse {
    pub success: bool,
    pub batch_id: Uuid,
    pub batch_number: String,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceStatusRequest {
    pub new_status: String,
}

#[derive(Serialize)]
pub struct StatusAdvancedResponse {
    pub success: bool,
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub completion_date: Option<DateTime<Utc>>,
}

/// Create a batch and debit its materials
pub async fn submit_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<Json<BatchCreatedResponse>> {
    input.validate()?;
    let detail = state
        .ledger
        .batches()
        .create_batch(current_user.0.user_id, input)
        .await?;
    Ok(Json(BatchCreatedResponse {
        success: true,
        batch_id: detail.batch.id,
        batch_number: detail.batch.batch_number,
    }))
}

/// Advance a batch one stage. Requires `batches:advance`.
pub async fn advance_batch_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(request): Json<AdvanceStatusRequest>,
) -> AppResult<Json<StatusAdvancedResponse>> {
    check_permission(&current_user.0, "batches", "advance")?;

    let new_status = request
        .new_status
        .trim()
        .parse::<BatchStatus>()
        .map_err(|e| AppError::validation("new_status", e.to_string()))?;

    let batch = state
        .ledger
        .batches()
        .advance_status(batch_id, new_status, current_user.0.user_id)
        .await?;
    Ok(Json(StatusAdvancedResponse {
        success: true,
        batch_id: batch.id,
        status: batch.status,
        completion_date: batch.completion_date,
    }))
}

pub async fn get_batch(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<BatchDetail>> {
    let detail = state.ledger.batches().get_batch(batch_id).await?;
    Ok(Json(detail))
}

pub async fn list_batches(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<ManufacturingBatch>>> {
    let batches = state.ledger.batches().list_batches().await?;
    Ok(Json(batches))
}

/// Status counts and urgency of in-flight batches
pub async fn get_batch_pipeline(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<BatchPipeline>> {
    let pipeline = state.ledger.batches().pipeline(Utc::now()).await?;
    Ok(Json(pipeline))
}
