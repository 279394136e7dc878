//! WebSocket notifications
//!
//! Pushes status changes (declarations, applications, transactions) to the
//! user they concern.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    Extension,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::middleware::auth::CurrentUser;
use crate::state::AppState;

/// WebSocket message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "notification")]
    Notification(serde_json::Value),
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
}

/// WebSocket upgrade handler
pub async fn serve_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> impl IntoResponse {
    let notifications = state.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, current_user, notifications))
}

/// Handle a WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    user: CurrentUser,
    mut notifications: broadcast::Receiver<crate::state::WsNotification>,
) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let user_id = user.id;

    tracing::debug!("WebSocket connected for user {}", user_id);

    let send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                Some(msg) = rx.recv() => msg,
                received = notifications.recv() => match received {
                    Ok(n) if n.user_id == user_id => WsMessage::Notification(n.message),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("WebSocket for user {} lagged, {} notifications skipped", user_id, skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                else => break,
            };

            let text = serde_json::to_string(&message).unwrap_or_default();
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Ok(WsMessage::Ping) = serde_json::from_str::<WsMessage>(&text) {
                        let _ = tx.send(WsMessage::Pong);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    join_first(send_task, recv_task).await;

    tracing::debug!("WebSocket closed for user {}", user.id);
}

/// Wait for whichever task ends first and abort the other
async fn join_first(mut first: JoinHandle<()>, mut second: JoinHandle<()>) {
    tokio::select! {
        _ = &mut first => second.abort(),
        _ = &mut second => first.abort(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn losing_task_is_aborted() {
        let (guard, released) = tokio::sync::oneshot::channel::<()>();
        let finished = tokio::spawn(async {});
        let stuck = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });

        join_first(stuck, finished).await;

        // The sender is only dropped once the stuck task is torn down
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), released)
            .await
            .expect("stuck task still running");
        assert!(result.is_err());
    }

    #[test]
    fn messages_are_tagged() {
        let msg = WsMessage::Notification(serde_json::json!({"type": "dialStatus", "status": "approved"}));
        let text = serde_json::to_string(&msg).unwrap();
        assert!(text.contains(r#""type":"notification""#));
        assert!(text.contains(r#""status":"approved""#));

        let ping: WsMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, WsMessage::Ping));
    }
}
