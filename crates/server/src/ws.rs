use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

use crate::state::AppState;

/// WebSocket handler streaming live progress events for one project's
/// generation run.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(project_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, project_id, state))
}

async fn handle_socket(mut socket: WebSocket, project_id: String, state: Arc<AppState>) {
    let rx = state.store.subscribe_progress(&project_id).await;
    let Some(mut rx) = rx else {
        let _ = socket
            .send(Message::Text(
                serde_json::json!({"error": "project not found"}).to_string().into(),
            ))
            .await;
        return;
    };

    if let Some(project) = state.store.get_project(&project_id).await {
        let msg = serde_json::to_string(&project).unwrap_or_default();
        if socket.send(Message::Text(msg.into())).await.is_err() {
            return;
        }
    }

    loop {
        match rx.recv().await {
            Ok(progress) => {
                let msg = serde_json::to_string(&progress).unwrap_or_default();
                if socket.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
        }
    }
}
