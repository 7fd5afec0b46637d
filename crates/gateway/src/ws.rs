//! Per-connection WebSocket loop.
//!
//! Each socket is split into a read half driven here and a write half
//! drained by a spawned task fed from an unbounded queue. Handlers never
//! await a peer: they enqueue frames and move on, so one slow client
//! cannot stall dispatch.

use axum::extract::ws::{Message, WebSocket};
use {
    futures::{SinkExt, StreamExt},
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use crate::{router, state::GatewayState};

/// Run one client connection to completion.
pub async fn handle_connection(socket: WebSocket, state: std::sync::Arc<GatewayState>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Outbound queue: the registry holds the sender; this task drains it.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.presence.write().await.attach(&conn_id, tx);
    info!(conn_id = %conn_id, "client connected");

    let write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Read loop: one frame is processed to completion before the next.
    while let Some(received) = ws_rx.next().await {
        match received {
            Ok(Message::Text(text)) => {
                router::handle_text(&state, &conn_id, text.as_str()).await;
            },
            Ok(Message::Close(_)) => break,
            // Pings are answered by axum; binary frames are not part of
            // the protocol.
            Ok(_) => {},
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "websocket error");
                break;
            },
        }
    }

    // Cleanup: the registry stops resolving this identity; in-flight
    // fan-outs simply skip it.
    match state.presence.write().await.detach(&conn_id) {
        Some(cpf) => info!(cpf = %cpf, "user disconnected"),
        None => debug!(conn_id = %conn_id, "client disconnected"),
    }
    write_task.abort();
}
