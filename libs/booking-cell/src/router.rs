use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::AppState;

pub fn booking_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/appointments",
            get(handlers::list_appointments).post(handlers::book_appointment),
        )
        .route("/appointments/my-appointments", get(handlers::my_appointments))
        .route(
            "/appointments/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/calendar/events", get(handlers::get_calendar_events))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    // Browsing availability needs no account.
    let public_routes = Router::new().route(
        "/availability/{provider_id}",
        get(handlers::get_availability),
    );

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .with_state(state)
}
