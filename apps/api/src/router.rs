use axum::{routing::get, Router};

use booking_cell::router::booking_routes;
use booking_cell::AppState;
use notification_cell::realtime::{realtime_routes, RealtimeState};
use notification_cell::router::notification_routes;
use notification_cell::NotificationsState;

pub fn create_router(
    state: AppState,
    notifications: NotificationsState,
    realtime: RealtimeState,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Bookline API is running!" }))
        .merge(booking_routes(state))
        .merge(notification_routes(notifications))
        .merge(realtime_routes(realtime))
}
