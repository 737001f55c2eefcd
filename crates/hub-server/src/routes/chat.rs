//! Bidirectional chat stream (spec.md §6 `GET /ws/chat/:sessionHandle`).
//!
//! The session handle travels in the path rather than an `Authorization`
//! header, so this route sits outside the `require_session` middleware
//! stack and validates the handle itself before upgrading.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Extension, Path};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use hub_primitives::User;
use hub_repository::UserRepository;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientFrame {
    Stop {
        #[serde(rename = "_internal_cmd_token")]
        token: String,
    },
    #[serde(other)]
    Message,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    message: String,
}

pub async fn chat_socket_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
    Path(session_handle): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_handle))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, session_handle: String) {
    let subject = match state.sessions.validate(&session_handle).await {
        Ok(s) => s,
        Err(e) => {
            debug!(error = %e, "chat socket rejected: invalid session handle");
            let _ = close_with(socket, "invalid or expired session handle").await;
            return;
        }
    };

    let user: User = match state.repo.find_by_id(subject).await {
        Ok(Some(u)) => u,
        _ => {
            let _ = close_with(socket, "session subject no longer exists").await;
            return;
        }
    };
    let effective_tags: Vec<String> = state
        .tag_resolver
        .effective_tags(&user)
        .await
        .into_iter()
        .collect();

    let (mut ws_tx, mut ws_rx) = socket.split();

    let stop_token = state.chat.stop_token(&session_handle);
    if send_json(&mut ws_tx, &hub_chat::frames::session(&stop_token)).await.is_err() {
        return;
    }

    // `active_turn` is the in-flight turn's frame channel, if any. Reading
    // it concurrently with `ws_rx` (rather than draining it to completion
    // before the next `ws_rx.next()`) is what lets a stop control frame
    // arrive and take effect while a response is still streaming.
    let mut active_turn: Option<mpsc::Receiver<Value>> = None;

    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                let frame = match incoming {
                    Some(Ok(f)) => f,
                    Some(Err(e)) => {
                        error!(error = %e, session_handle, "chat socket read error");
                        break;
                    }
                    None => break,
                };

                let text = match frame {
                    Message::Text(t) => t,
                    Message::Close(_) => break,
                    _ => continue,
                };

                match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(ClientFrame::Stop { token }) => {
                        if let Some(reply) = state.chat.request_stop(&session_handle, &token) {
                            if send_json(&mut ws_tx, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    _ => {
                        let user_message = match serde_json::from_str::<IncomingMessage>(&text) {
                            Ok(m) => m.message,
                            Err(_) => continue,
                        };
                        active_turn = Some(state.chat.handle_message(
                            session_handle.clone(),
                            user.id,
                            effective_tags.clone(),
                            user_message,
                        ));
                    }
                }
            }

            turn_frame = recv_active(&mut active_turn) => {
                match turn_frame {
                    Some(frame) => {
                        if send_json(&mut ws_tx, &frame).await.is_err() {
                            break;
                        }
                    }
                    None => active_turn = None,
                }
            }
        }
    }
}

/// Awaits the active turn's next frame, or never resolves when there is no
/// turn in flight — letting `tokio::select!` poll `ws_rx` exclusively
/// between turns instead of busy-looping on a closed channel.
async fn recv_active(active_turn: &mut Option<mpsc::Receiver<Value>>) -> Option<Value> {
    match active_turn {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_json(
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    value: &Value,
) -> Result<(), axum::Error> {
    tx.send(Message::Text(value.to_string())).await
}

async fn close_with(mut socket: WebSocket, reason: &str) -> Result<(), axum::Error> {
    let _ = socket
        .send(Message::Text(serde_json::json!({ "error": reason }).to_string()))
        .await;
    socket.close().await
}
