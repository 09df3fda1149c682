use axum::{
    extract::State,
    extract::ws::{WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    app_state::AppState, protocol::WebSocketConnection, service::handle_display_connection,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let display_id = format!("display-{}", Uuid::new_v4());
    let connection = WebSocketConnection::new(socket, display_id);

    handle_display_connection(connection, state).await;
}
