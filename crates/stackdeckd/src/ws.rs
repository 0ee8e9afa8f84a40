//! WebSocket によるステータス配信
//!
//! クライアントごとに独立したループで、一定間隔で全サービスを更新して
//! スナップショットを送る。送信失敗はそのクライアントのループだけを終える。

use crate::AppState;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_loop(socket, state))
}

async fn client_loop(mut socket: WebSocket, state: AppState) {
    let period = state.broadcast_interval;
    // 最初の配信は1周期後
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("WebSocket client connected");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let services = state.manager.list().await;
                let text = match serde_json::to_string(&services) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize service snapshot");
                        continue;
                    }
                };

                if let Err(e) = socket.send(Message::Text(text.into())).await {
                    debug!(error = %e, "WebSocket send failed");
                    break;
                }
            }
            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // 受信内容は使わない
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
