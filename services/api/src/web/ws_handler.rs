//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It owns one session controller per connection and delegates user actions
//! into it.

use crate::web::{
    protocol::{ClientMessage, CourseSummary, ServerMessage},
    state::{AppState, ConnectionState, PendingUpload},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use bytes::Bytes;
use curriculum_chat_core::{MessageRole, SendRejected, Status};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable access across tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // One controller per connection keeps sessions isolated per user.
    let connection = Arc::new(Mutex::new(ConnectionState::new(&app_state)));

    // --- 1. Greeting Phase ---
    let courses: Vec<CourseSummary> = app_state.catalog.iter().map(CourseSummary::from).collect();
    if send_message(&ws_sender, &ServerMessage::SessionReady { courses })
        .await
        .is_err()
    {
        error!("Failed to send session ready message.");
        return;
    }

    // --- 2. Main Message Loop ---
    loop {
        if let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_message(text.to_string(), &app_state, &connection, &ws_sender)
                        .await;
                }
                Message::Binary(data) => {
                    let mut conn = connection.lock().await;
                    match conn.pending_upload.as_mut() {
                        Some(upload) => upload.buffer.extend_from_slice(&data),
                        None => warn!("Dropping binary frame received outside an upload."),
                    }
                }
                Message::Close(_) => {
                    info!("Client sent close message.");
                    break;
                }
                _ => {}
            }
        } else {
            info!("Client disconnected.");
            break;
        }
    }

    info!("WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: String,
    app_state: &Arc<AppState>,
    connection: &Arc<Mutex<ConnectionState>>,
    ws_sender: &WsSender,
) {
    let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            return;
        }
    };

    match client_msg {
        ClientMessage::SelectCourse { course_id } => {
            let mut conn = connection.lock().await;
            if conn.controller.select_course(&course_id) {
                let view = conn.controller.view();
                drop(conn);
                let _ = send_message(ws_sender, &ServerMessage::ViewChanged { view }).await;
            }
        }
        ClientMessage::Back => {
            let mut conn = connection.lock().await;
            // Leaving a screen abandons any half-received upload.
            if conn.controller.back() {
                conn.pending_upload = None;
                let view = conn.controller.view();
                let status = conn.controller.status();
                drop(conn);
                let _ = send_message(ws_sender, &ServerMessage::ViewChanged { view }).await;
                let _ = send_message(ws_sender, &ServerMessage::StatusChanged { status }).await;
            }
        }
        ClientMessage::SetChapterFocus { focus } => {
            let mut conn = connection.lock().await;
            if !conn.controller.set_chapter_focus(&focus) {
                warn!("Chapter focus ignored outside the course setup screen.");
            }
        }
        ClientMessage::BeginUpload {
            filename,
            media_type,
        } => {
            let mut conn = connection.lock().await;
            if conn.controller.begin_upload() {
                conn.pending_upload = Some(PendingUpload {
                    filename,
                    media_type,
                    buffer: Vec::new(),
                });
                let status = conn.controller.status();
                drop(conn);
                let _ = send_message(ws_sender, &ServerMessage::StatusChanged { status }).await;
            } else {
                warn!("Upload refused: not on the course setup screen or the session is busy.");
            }
        }
        ClientMessage::EndUpload => {
            let mut conn = connection.lock().await;
            let Some(upload) = conn.pending_upload.take() else {
                warn!("EndUpload received without a pending upload.");
                return;
            };
            let result = conn.controller.finish_upload(
                &upload.filename,
                &upload.media_type,
                Bytes::from(upload.buffer),
            );
            let status = conn.controller.status();
            drop(conn);
            match result {
                Ok(reference) => {
                    let _ = send_message(
                        ws_sender,
                        &ServerMessage::DocumentAttached {
                            filename: reference.filename,
                            size_bytes: reference.size_bytes,
                        },
                    )
                    .await;
                }
                Err(e) => {
                    let _ = send_message(
                        ws_sender,
                        &ServerMessage::UploadRejected {
                            message: e.user_notice(),
                        },
                    )
                    .await;
                }
            }
            let _ = send_message(ws_sender, &ServerMessage::StatusChanged { status }).await;
        }
        ClientMessage::AbortUpload => {
            let mut conn = connection.lock().await;
            conn.pending_upload = None;
            conn.controller.abort_upload();
            let status = conn.controller.status();
            drop(conn);
            let _ = send_message(ws_sender, &ServerMessage::StatusChanged { status }).await;
        }
        ClientMessage::ClearDocument => {
            let mut conn = connection.lock().await;
            if conn.controller.clear_document() {
                drop(conn);
                let _ = send_message(ws_sender, &ServerMessage::DocumentCleared).await;
            }
        }
        ClientMessage::StartChat => {
            let mut conn = connection.lock().await;
            if conn.controller.start_chat() {
                let view = conn.controller.view();
                drop(conn);
                let _ = send_message(ws_sender, &ServerMessage::ViewChanged { view }).await;
            } else {
                warn!("StartChat refused: no document attached or the session is busy.");
            }
        }
        ClientMessage::SendQuestion { text } => {
            run_exchange(text, app_state, connection, ws_sender).await;
        }
    }
}

/// Runs one question/answer exchange. The session lock is held only to
/// record the turns, never across the remote call.
async fn run_exchange(
    question: String,
    app_state: &Arc<AppState>,
    connection: &Arc<Mutex<ConnectionState>>,
    ws_sender: &WsSender,
) {
    // First half under the session lock: record the user's turn and capture
    // everything the gateway call needs.
    let turn = {
        let mut conn = connection.lock().await;
        match conn.controller.begin_question(&question) {
            Ok(turn) => turn,
            Err(SendRejected::Busy) => {
                // An exchange is already in flight; the send is a no-op.
                warn!("Question ignored: the session is already processing one.");
                return;
            }
            Err(reason) => {
                warn!(?reason, "Question rejected at the connection boundary.");
                drop(conn);
                let _ = send_message(
                    ws_sender,
                    &ServerMessage::Error {
                        message: "The question cannot be sent from the current state.".to_string(),
                    },
                )
                .await;
                return;
            }
        }
    };

    let _ = send_message(
        ws_sender,
        &ServerMessage::MessageAppended {
            role: MessageRole::User,
            content: turn.question.clone(),
        },
    )
    .await;
    let _ = send_message(
        ws_sender,
        &ServerMessage::StatusChanged {
            status: Status::Processing,
        },
    )
    .await;

    let outcome = app_state
        .gateway
        .ask(
            &turn.question,
            &turn.document,
            &turn.history,
            &turn.chapter_focus,
        )
        .await;

    // Second half: record the outcome and report the appended assistant turn.
    let (content, status) = {
        let mut conn = connection.lock().await;
        conn.controller.complete_question(&turn, outcome);
        let content = conn
            .controller
            .transcript()
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        (content, conn.controller.status())
    };
    let _ = send_message(
        ws_sender,
        &ServerMessage::MessageAppended {
            role: MessageRole::Assistant,
            content,
        },
    )
    .await;
    let _ = send_message(ws_sender, &ServerMessage::StatusChanged { status }).await;
}

async fn send_message(ws_sender: &WsSender, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).unwrap();
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
}
