//! HTTP handlers for fund endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use shared::{Fund, FundSummary, FundUsage};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::RecordUsageInput;
use crate::AppState;

#[derive(Serialize)]
pub struct FundUsageResponse {
    pub success: bool,
    pub usage_id: Uuid,
}

/// Record a usage against a fund
pub async fn submit_fund_usage(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordUsageInput>,
) -> AppResult<Json<FundUsageResponse>> {
    input.validate()?;
    let usage = state
        .ledger
        .funds()
        .record_usage(current_user.0.user_id, input)
        .await?;
    Ok(Json(FundUsageResponse {
        success: true,
        usage_id: usage.id,
    }))
}

/// Fund summary for the current user
pub async fn get_my_fund_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<FundSummary>> {
    let summary = state.ledger.funds().summarize(current_user.0.user_id).await?;
    Ok(Json(summary))
}

/// Fund summary for any user
pub async fn get_fund_summary(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<FundSummary>> {
    let summary = state.ledger.funds().summarize(user_id).await?;
    Ok(Json(summary))
}

pub async fn get_fund(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(fund_id): Path<Uuid>,
) -> AppResult<Json<Fund>> {
    let fund = state.ledger.funds().get_fund(fund_id).await?;
    Ok(Json(fund))
}

pub async fn list_fund_usages(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(fund_id): Path<Uuid>,
) -> AppResult<Json<Vec<FundUsage>>> {
    let usages = state.ledger.funds().list_usages(fund_id).await?;
    Ok(Json(usages))
}

/// Return a fund. Requires `funds:return`.
pub async fn return_fund(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(fund_id): Path<Uuid>,
) -> AppResult<Json<Fund>> {
    check_permission(&current_user.0, "funds", "return")?;
    let fund = state
        .ledger
        .funds()
        .return_fund(fund_id, current_user.0.user_id)
        .await?;
    Ok(Json(fund))
}
