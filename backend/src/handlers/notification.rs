//! HTTP handlers for notifications

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use shared::Notification;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub success: bool,
}

/// Notifications for the current user, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state
        .ledger
        .transfers()
        .notifications_for(current_user.0.user_id)
        .await?;
    Ok(Json(notifications))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<MarkReadResponse>> {
    state
        .ledger
        .transfers()
        .mark_notification_read(notification_id, current_user.0.user_id)
        .await?;
    Ok(Json(MarkReadResponse { success: true }))
}
