//! Client WebSocket: inbound text frames are UCI commands, outbound frames
//! are wire commands fanned out from the orchestrator.
use std::sync::atomic::Ordering;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::orchestrator::OrchestratorInput;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut outbound = state.outbound.subscribe();
    let connections = state.connections.fetch_add(1, Ordering::Relaxed) + 1;
    info!(connections, "Client connected");

    let mut send_task = tokio::spawn(async move {
        loop {
            match outbound.recv().await {
                Ok(line) => {
                    if sender.send(Message::Text(line.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Client lagging, dropped commands");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let inputs = state.inputs.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(t) => t.to_string(),
                Message::Close(_) => break,
                _ => continue,
            };
            for command in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                debug!(cmd = %command, "client >");
                if inputs
                    .send(OrchestratorInput::ClientCommand(command.to_string()))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
    });

    // Whichever side finishes first takes the other down with it
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let connections = state.connections.fetch_sub(1, Ordering::Relaxed) - 1;
    info!(connections, "Client disconnected");
}
