use axum::{
    middleware,
    routing::{delete, get, put},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::NotificationsState;

pub fn notification_routes(state: NotificationsState) -> Router {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/unread-count", get(handlers::unread_count))
        .route("/notifications/mark-all-read", put(handlers::mark_all_read))
        .route("/notifications/{notification_id}/read", put(handlers::mark_read))
        .route(
            "/notifications/{notification_id}",
            delete(handlers::delete_notification),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
