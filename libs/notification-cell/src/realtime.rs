use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::events::{BookingEvent, EventBus};
use shared_utils::jwt::validate_token;

#[derive(Clone)]
pub struct RealtimeState {
    pub config: Arc<AppConfig>,
    pub events: EventBus,
}

#[derive(Deserialize)]
pub struct WsQuery {
    token: String,
}

pub fn realtime_routes(state: RealtimeState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

/// Browsers cannot set an Authorization header on a websocket handshake, so
/// the token travels as a query parameter.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<RealtimeState>,
    Query(query): Query<WsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = validate_token(&query.token, &state.config.jwt_secret).map_err(AppError::Auth)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

fn concerns(event: &BookingEvent, user_id: Uuid) -> bool {
    let appointment = event.appointment();
    appointment.user_id == user_id || appointment.provider_id == user_id
}

async fn handle_socket(socket: WebSocket, state: RealtimeState, user: User) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.events.subscribe();
    let user_id = user.uuid();
    let is_admin = user.is_admin();

    let send_task = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "websocket client lagged behind");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let relevant = is_admin || user_id.map(|id| concerns(&event, id)).unwrap_or(false);
            if !relevant {
                continue;
            }

            let Ok(payload) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // Inbound frames are ignored; the loop only notices the close.
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }
    tracing::debug!(user = %user.id, "websocket disconnected");
}
