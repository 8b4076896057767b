use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use booking_cell::AppState;
use notification_cell::consumer::NotificationConsumer;
use notification_cell::realtime::RealtimeState;
use notification_cell::reminder::ReminderScheduler;
use notification_cell::NotificationsState;
use shared_config::AppConfig;
use shared_database::{BookingStore, MemoryStore, RestStore};

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Bookline API server");

    let config = Arc::new(AppConfig::from_env());

    let store: Arc<dyn BookingStore> = if config.is_configured() {
        Arc::new(RestStore::new(config.clone()))
    } else {
        warn!("database not configured, falling back to the in-memory store");
        Arc::new(MemoryStore::new())
    };

    let state = AppState::new(config.clone(), store.clone());

    // Background workers: notification fan-out and the reminder sweep.
    NotificationConsumer::new(config.clone(), store.clone()).spawn(&state.events);
    ReminderScheduler::new(config.clone(), store.clone()).spawn();

    let notifications = NotificationsState {
        config: config.clone(),
        store,
    };
    let realtime = RealtimeState {
        config: config.clone(),
        events: state.events.clone(),
    };

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(state, notifications, realtime)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
