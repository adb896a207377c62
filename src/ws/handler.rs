//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{SessionInput, SessionMode};
use crate::util::rate_limit::MemberRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session credential issued by the bootstrap endpoint
    pub session: String,
    /// Match variant to join
    #[serde(default)]
    pub mode: SessionMode,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, query: WsQuery, state: AppState) {
    let participant_id = Uuid::new_v4();
    info!(participant = %participant_id, mode = ?query.mode, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Send welcome message
    let welcome = ServerMsg::Welcome {
        participant_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(participant = %participant_id, error = %e, "Failed to send welcome");
        return;
    }

    // Seat the connection in a session; admission failure closes the socket
    let (input_tx, events_rx) = match state
        .lobby
        .place(participant_id, query.mode, query.session)
        .await
    {
        Ok(channels) => channels,
        Err(e) => {
            warn!(participant = %participant_id, error = %e, "Join rejected");
            let rejected = ServerMsg::Error {
                code: "join_rejected".to_string(),
                message: e.to_string(),
            };
            let _ = send_msg(&mut ws_sink, &rejected).await;
            return;
        }
    };

    // Run the session with split read/write
    run_connection(participant_id, ws_sink, ws_stream, input_tx, events_rx).await;

    // Cleanup on disconnect
    state.lobby.disconnect(participant_id).await;

    info!(participant = %participant_id, "WebSocket connection closed");
}

/// Run the WebSocket connection with read/write split
async fn run_connection(
    participant_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<SessionInput>,
    mut events_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = MemberRateLimiter::new();

    // Spawn writer task: session broadcasts -> WebSocket
    let writer_participant = participant_id;
    let writer_handle = tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(participant = %writer_participant, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        participant = %writer_participant,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(participant = %writer_participant, "Event channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> session loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(participant = %participant_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        let input = SessionInput::Client {
                            participant_id,
                            msg,
                        };

                        if input_tx.send(input).await.is_err() {
                            debug!(participant = %participant_id, "Input channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(participant = %participant_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(participant = %participant_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(participant = %participant_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(participant = %participant_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(participant = %participant_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(participant = %participant_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task; the lobby delivers the leave to the session
    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
