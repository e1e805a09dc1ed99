//! HTTP handlers for the product catalog

use axum::{extract::State, Json};
use shared::Product;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::RegisterProductInput;
use crate::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    let products = state.ledger.catalog().list_products().await?;
    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<RegisterProductInput>,
) -> AppResult<Json<Product>> {
    input.validate()?;
    let product = state.ledger.catalog().register_product(input).await?;
    Ok(Json(product))
}
