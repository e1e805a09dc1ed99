//! HTTP handlers for finished-goods inventory and transfers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use shared::{InventorySummary, InventoryTransfer, TransferStatus};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::InitiateTransferInput;
use crate::AppState;

#[derive(Serialize)]
pub struct TransferResponse {
    pub success: bool,
    pub transfer_id: Uuid,
    pub status: TransferStatus,
}

impl From<InventoryTransfer> for TransferResponse {
    fn from(transfer: InventoryTransfer) -> Self {
        Self {
            success: true,
            transfer_id: transfer.id,
            status: transfer.status,
        }
    }
}

/// Move inventory between locations
pub async fn submit_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<InitiateTransferInput>,
) -> AppResult<Json<TransferResponse>> {
    input.validate()?;
    let transfer = state
        .ledger
        .transfers()
        .initiate(current_user.0.user_id, input)
        .await?;
    Ok(Json(transfer.into()))
}

pub async fn confirm_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<TransferResponse>> {
    let transfer = state
        .ledger
        .transfers()
        .confirm(transfer_id, current_user.0.user_id)
        .await?;
    Ok(Json(transfer.into()))
}

pub async fn cancel_transfer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<TransferResponse>> {
    let transfer = state
        .ledger
        .transfers()
        .cancel(transfer_id, current_user.0.user_id)
        .await?;
    Ok(Json(transfer.into()))
}

pub async fn list_transfers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryTransfer>>> {
    let transfers = state.ledger.transfers().list_transfers().await?;
    Ok(Json(transfers))
}

/// Inventory totals by location and by product/batch
pub async fn get_inventory_summary(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<InventorySummary>> {
    let summary = state.ledger.inventory().summary().await?;
    Ok(Json(summary))
}
