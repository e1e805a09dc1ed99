//! HTTP handlers for raw material purchases

use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::Purchase;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::RecordPurchaseInput;
use crate::AppState;

#[derive(Serialize)]
pub struct PurchaseResponse {
    pub success: bool,
    pub purchase_id: Uuid,
    pub total_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseFilter {
    pub material_id: Option<Uuid>,
}

/// Record a purchase paid from a fund
pub async fn submit_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordPurchaseInput>,
) -> AppResult<Json<PurchaseResponse>> {
    input.validate()?;
    let purchase = state
        .ledger
        .purchases()
        .record_purchase(current_user.0.user_id, input)
        .await?;
    Ok(Json(PurchaseResponse {
        success: true,
        purchase_id: purchase.id,
        total_amount: purchase.total_amount,
    }))
}

pub async fn list_purchases(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<PurchaseFilter>,
) -> AppResult<Json<Vec<Purchase>>> {
    let purchases = state.ledger.purchases().list_purchases(filter.material_id).await?;
    Ok(Json(purchases))
}
