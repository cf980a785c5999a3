//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It routes client messages to the session's play task and owns its lifetime.

use crate::web::{
    play_task::{challenge_process, solo_process},
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, PlayerAnswer, SessionMode, SessionState},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{stream::StreamExt, SinkExt};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New WebSocket connection established for user: {}", user_id);

    // Every task writes through this channel; a single writer owns the socket sink.
    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                warn!("Failed to send message to client. Closing writer.");
                break;
            }
        }
    });

    let mut session = SessionState::new(user_id);

    // --- Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                handle_text_message(text.to_string(), &app_state, &mut session, &outbound);
            }
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- Cleanup ---
    session.stop_play();
    drop(outbound);
    writer.abort();
    info!("WebSocket connection closed for user: {}", user_id);
}

/// Helper function to handle the logic for different `ClientMessage` variants.
fn handle_text_message(
    text: String,
    app_state: &Arc<AppState>,
    session: &mut SessionState,
    outbound: &mpsc::UnboundedSender<ServerMessage>,
) {
    let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let _ = outbound.send(ServerMessage::Error {
                message: "Unrecognized message.".to_string(),
            });
            return;
        }
    };

    match client_msg {
        ClientMessage::StartSolo { tier } => {
            info!("StartSolo message received.");
            let tier = tier.into();
            let (token, answers) = session.begin_play(SessionMode::Solo(tier));
            let app_state = app_state.clone();
            let outbound = outbound.clone();
            let user_id = session.user_id;
            tokio::spawn(async move {
                let errors = outbound.clone();
                let played = solo_process(app_state, user_id, tier, outbound, answers, token).await;
                if let Err(e) = played {
                    error!("Solo process failed: {:?}", e);
                    let _ = errors.send(ServerMessage::Error { message: e.to_string() });
                }
            });
        }
        ClientMessage::JoinChallenge { challenge_id } => {
            info!("JoinChallenge message received for challenge {}.", challenge_id);
            let (token, answers) = session.begin_play(SessionMode::Challenge(challenge_id));
            let app_state = app_state.clone();
            let outbound = outbound.clone();
            let user_id = session.user_id;
            tokio::spawn(async move {
                let errors = outbound.clone();
                let played =
                    challenge_process(app_state, user_id, challenge_id, outbound, answers, token)
                        .await;
                if let Err(e) = played {
                    error!("Challenge process failed: {:?}", e);
                    let _ = errors.send(ServerMessage::Error { message: e.to_string() });
                }
            });
        }
        ClientMessage::Answer {
            question_id,
            option_index,
        } => {
            let answer = PlayerAnswer {
                question_id,
                option_index,
            };
            let delivered = match &session.answer_tx {
                Some(answer_tx) => match answer_tx.try_send(answer) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!("Answer queue full; dropping answer.");
                        true
                    }
                    Err(TrySendError::Closed(_)) => false,
                },
                None => false,
            };
            if !delivered {
                let _ = outbound.send(ServerMessage::Error {
                    message: "No question is live.".to_string(),
                });
            }
        }
        ClientMessage::Leave => {
            info!("Leave message received. Cancelling play task.");
            session.stop_play();
        }
    }
}
