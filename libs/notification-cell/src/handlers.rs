use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::NotificationsState;

const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    user.uuid()
        .ok_or_else(|| AppError::Auth("Invalid subject claim".to_string()))
}

fn map_store(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::NotFound("Notification not found".to_string()),
        other => AppError::Database(other.to_string()),
    }
}

pub async fn list_notifications(
    State(state): State<NotificationsState>,
    Extension(user): Extension<User>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let notifications = state
        .store
        .list_notifications(user_id, limit, offset)
        .await
        .map_err(map_store)?;

    Ok(Json(json!({ "notifications": notifications })))
}

pub async fn unread_count(
    State(state): State<NotificationsState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;
    let count = state
        .store
        .unread_notification_count(user_id)
        .await
        .map_err(map_store)?;

    Ok(Json(json!({ "count": count })))
}

pub async fn mark_read(
    State(state): State<NotificationsState>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;
    let notification = state
        .store
        .mark_notification_read(notification_id, user_id)
        .await
        .map_err(map_store)?;

    Ok(Json(json!({
        "message": "Notification marked as read",
        "notification": notification,
    })))
}

pub async fn mark_all_read(
    State(state): State<NotificationsState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;
    let count = state
        .store
        .mark_all_notifications_read(user_id)
        .await
        .map_err(map_store)?;

    Ok(Json(json!({
        "message": "All notifications marked as read",
        "count": count,
    })))
}

pub async fn delete_notification(
    State(state): State<NotificationsState>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;
    state
        .store
        .delete_notification(notification_id, user_id)
        .await
        .map_err(map_store)?;

    Ok(Json(json!({
        "message": "Notification deleted successfully"
    })))
}
