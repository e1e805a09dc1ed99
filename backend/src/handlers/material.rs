//! HTTP handlers for raw materials

use axum::{extract::State, Json};
use shared::RawMaterial;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::RegisterMaterialInput;
use crate::AppState;

pub async fn list_materials(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<RawMaterial>>> {
    let materials = state.ledger.materials().list_materials().await?;
    Ok(Json(materials))
}

pub async fn create_material(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<RegisterMaterialInput>,
) -> AppResult<Json<RawMaterial>> {
    input.validate()?;
    let material = state.ledger.materials().register_material(input).await?;
    Ok(Json(material))
}

/// Materials at or below their minimum stock level
pub async fn list_low_stock_materials(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<RawMaterial>>> {
    let materials = state.ledger.materials().low_stock().await?;
    Ok(Json(materials))
}
