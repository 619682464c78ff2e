use crate::codec::{decode, decode_bytes};
use crate::error::DecodeError;
use crate::registry::{ConnectionHandle, ConnectionId};
use crate::startup::AppState;
use axum::{
    extract::{
        Extension,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::time::Duration;
use tokio::{sync::mpsc, time::timeout};
use tracing::{debug, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(app_state): Extension<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Drives one client from upgrade to close. The handle is registered before
/// anything is read, and deregistered exactly once when either half ends.
async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (handle, outbound) = ConnectionHandle::channel(app_state.config.outbound_queue);
    let id = handle.id();

    if app_state.coordinator.connect(handle).await.is_err() {
        warn!("Coordinator unavailable, refusing client {id}");
        return;
    }

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_frames(
        id,
        sink,
        outbound,
        app_state.config.send_timeout,
    ));
    let mut reader = tokio::spawn(read_frames(id, stream, app_state.clone()));

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    // Already unregistered if the coordinator dropped us; that is fine.
    let _ = app_state.coordinator.disconnect(id).await;
}

async fn write_frames(
    id: ConnectionId,
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    send_timeout: Duration,
) {
    while let Some(frame) = outbound.recv().await {
        match timeout(send_timeout, sink.send(Message::Text(frame))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Send to client {id} failed: {e}");
                return;
            }
            Err(_) => {
                warn!("Send to client {id} timed out, closing");
                return;
            }
        }
    }

    // Queue closed by the coordinator: the client was dropped as a slow consumer.
    let _ = timeout(send_timeout, sink.close()).await;
}

async fn read_frames(id: ConnectionId, mut stream: SplitStream<WebSocket>, app_state: AppState) {
    while let Some(msg) = stream.next().await {
        let decoded = match msg {
            Ok(Message::Text(text)) => decode(&text),
            Ok(Message::Binary(bytes)) => decode_bytes(&bytes),
            Ok(Message::Close(_)) => return,
            Ok(_) => continue,
            Err(e) => {
                debug!("Client {id} transport error: {e}");
                return;
            }
        };

        match decoded.and_then(|msg| msg.into_vote()) {
            Ok(category) => {
                if app_state.coordinator.vote(category).await.is_err() {
                    return;
                }
            }
            Err(DecodeError::UnexpectedType) => {
                debug!("Ignoring non-vote message from client {id}");
            }
            Err(e) => {
                debug!("Dropping message from client {id}: {e}");
            }
        }
    }
}
