//! 対局状態のWebSocket配信
//! 接続時に現在の状態を送り、以降は着手ごとの状態を配信する。

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};

use super::dto::ApiResult;
use super::handlers::AppState;
use super::service::Subscription;
use crate::game::{SessionId, SessionSnapshot};

/// 存在しない対局への要求は、ハンドシェイクの検証より先に404で拒否する
pub async fn game_updates(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Path(game_id): Path<SessionId>,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    state.coordinator.get_session_state(game_id).await?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let subscription = state.coordinator.subscribe(game_id).await?;
    tracing::debug!(
        session_id = game_id,
        subscriber = %subscription.subscriber_id,
        "websocket subscribed"
    );

    Ok(ws.on_upgrade(move |socket| run_socket(socket, state, game_id, subscription)))
}

async fn send_snapshot(
    socket: &mut WebSocket,
    snapshot: &SessionSnapshot,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(snapshot) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "failed to encode snapshot");
            return Ok(());
        }
    };
    socket.send(Message::Text(payload)).await
}

async fn run_socket(
    mut socket: WebSocket,
    state: AppState,
    session_id: SessionId,
    subscription: Subscription,
) {
    let Subscription {
        subscriber_id,
        mut receiver,
        snapshot,
    } = subscription;

    if send_snapshot(&mut socket, &snapshot).await.is_ok() {
        loop {
            tokio::select! {
                update = receiver.recv() => match update {
                    Some(snapshot) => {
                        if send_snapshot(&mut socket, &snapshot).await.is_err() {
                            break;
                        }
                    }
                    // 配信が追いつかずハブから外された
                    None => break,
                },
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let sent = if text.trim() == "ping" {
                            socket.send(Message::Text("pong".to_string())).await
                        } else {
                            match state.coordinator.get_session_state(session_id).await {
                                Ok(current) => send_snapshot(&mut socket, &current.snapshot).await,
                                Err(_) => break,
                            }
                        };
                        if sent.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    state.coordinator.unsubscribe(session_id, subscriber_id);
    tracing::debug!(session_id, subscriber = %subscriber_id, "websocket closed");
}
