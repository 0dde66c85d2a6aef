//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. A `generate` request is answered with `started`,
//! one `chunk` per fragment, then `done` or `failed`.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::domain::GenerationRequest;
use crate::logic::{clear_session, run_generation, GenerationOutcome};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

const FRAGMENT_BUFFER: usize = 32;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "problem_forge", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn send_msg(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "problem_forge", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let incoming = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(m) => m,
          Err(e) => {
            let reply = ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) };
            if send_msg(&mut socket, &reply).await.is_err() { break; }
            continue;
          }
        };
        debug!(target: "problem_forge", "WS received: {:?}", &incoming);

        let keep_open = match incoming {
          ClientWsMessage::Ping => send_msg(&mut socket, &ServerWsMessage::Pong).await.is_ok(),
          ClientWsMessage::Clear { session_id } => {
            clear_session(&state, &session_id).await;
            send_msg(&mut socket, &ServerWsMessage::Cleared { session_id }).await.is_ok()
          }
          ClientWsMessage::Generate { session_id, request } => {
            let session_id = AppState::session_id_or_new(session_id);
            stream_generation(&mut socket, state.clone(), session_id, request).await
          }
        };

        if !keep_open {
          error!(target: "problem_forge", "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "problem_forge", "WebSocket disconnected");
}

/// Forward fragments as `chunk` messages while the generation task runs.
/// Returns false if the socket can no longer be written to.
async fn stream_generation(
  socket: &mut WebSocket,
  state: Arc<AppState>,
  session_id: String,
  request: GenerationRequest,
) -> bool {
  if send_msg(socket, &ServerWsMessage::Started { session_id: session_id.clone() }).await.is_err() {
    return false;
  }

  let (tx, mut rx) = mpsc::channel::<String>(FRAGMENT_BUFFER);
  let task = tokio::spawn(run_generation(state, session_id.clone(), request, tx));

  while let Some(text) = rx.recv().await {
    if send_msg(socket, &ServerWsMessage::Chunk { text }).await.is_err() {
      // Dropping the receiver makes the generation task stop at its next send.
      return false;
    }
  }

  let reply = match task.await {
    Ok(GenerationOutcome::Completed { problems }) => {
      info!(target: "generation", %session_id, count = problems.len(), "WS generation done");
      ServerWsMessage::Done { problems }
    }
    Ok(GenerationOutcome::Failed { message }) => ServerWsMessage::Failed { message },
    Ok(GenerationOutcome::Rejected { reason }) => ServerWsMessage::Failed { message: reason.to_string() },
    Err(e) => {
      error!(target: "generation", %session_id, error = %e, "Generation task panicked or was cancelled");
      ServerWsMessage::Error { message: "generation task failed".into() }
    }
  };
  send_msg(socket, &reply).await.is_ok()
}
