//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use axum_extra::{headers::Cookie, TypedHeader};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::outbound;
use crate::game::{LeaveReason, Outbound, OutboundRx};
use crate::http::auth::{resolve_identity, session_token, AuthError, Identity, SESSION_COOKIE};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_secs;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// How long the writer may keep flushing after the reader has finished
const WRITER_DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session credential, used when the cookie is absent
    #[serde(default)]
    pub token: Option<String>,
}

/// WebSocket upgrade handler
///
/// Admission is decided before the socket is handed to the arena. Refused
/// connections are still upgraded so the client sees a close code.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    cookies: Option<TypedHeader<Cookie>>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let cookie_token = cookies
        .as_ref()
        .and_then(|TypedHeader(cookies)| cookies.get(SESSION_COOKIE));
    let token = session_token(cookie_token, query.token.as_deref());

    match resolve_identity(token, &state.config.jwt_secret, &state.catalog, unix_secs()) {
        Ok(identity) => {
            info!(player_id = %identity.player_id, "WebSocket upgrade for admitted pilot");
            ws.on_upgrade(move |socket| handle_socket(socket, identity, state))
        }
        Err(e) => {
            warn!(error = %e, code = e.close_code(), "WebSocket admission refused");
            ws.on_upgrade(move |socket| refuse(socket, e))
        }
    }
}

/// Close a refused connection with the admission error's code
async fn refuse(mut socket: WebSocket, err: AuthError) {
    let frame = CloseFrame {
        code: err.close_code(),
        reason: err.close_reason().into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, identity: Identity, state: AppState) {
    let conn_id = Uuid::new_v4();
    let player_id = identity.player_id.clone();
    info!(player_id = %player_id, conn_id = %conn_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = outbound::channel();

    if state.arena.join(identity, conn_id, outbound_tx).await.is_err() {
        error!(player_id = %player_id, "Arena unavailable, dropping connection");
        return;
    }

    // Writer task: arena -> WebSocket
    let mut writer = tokio::spawn(write_outbound(ws_sink, outbound_rx, player_id.clone()));

    // Reader: WebSocket -> arena. A finished writer means the arena closed
    // this connection (superseded) or the socket is gone.
    let reason = tokio::select! {
        reason = read_inbound(ws_stream, &state, &player_id, conn_id) => reason,
        _ = &mut writer => LeaveReason::Closed,
    };

    let _ = state.arena.leave(&player_id, conn_id, reason).await;

    // The arena drops our queue on leave; let the writer flush any close frame
    if !writer.is_finished() && timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }

    info!(player_id = %player_id, conn_id = %conn_id, reason = ?reason, "WebSocket connection closed");
}

/// Drain the connection's outbound queue onto the socket
async fn write_outbound(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: OutboundRx,
    player_id: String,
) {
    while let Some(item) = outbound_rx.recv().await {
        match item {
            Outbound::Message(msg) => {
                if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                    debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
            Outbound::Close { code, reason } => {
                debug!(player_id = %player_id, code, "Closing WebSocket");
                let frame = CloseFrame {
                    code,
                    reason: reason.into(),
                };
                let _ = ws_sink.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }
}

/// Forward client messages to the arena until the socket closes or goes idle
async fn read_inbound(
    mut ws_stream: SplitStream<WebSocket>,
    state: &AppState,
    player_id: &str,
    conn_id: Uuid,
) -> LeaveReason {
    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);

    loop {
        let next = match state.config.idle_timeout {
            Some(idle) => match timeout(idle, ws_stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    info!(player_id = %player_id, "No traffic within idle timeout");
                    return LeaveReason::Idle;
                }
            },
            None => ws_stream.next().await,
        };

        let Some(result) = next else {
            return LeaveReason::Closed;
        };

        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if state.arena.inbound(player_id, conn_id, msg).await.is_err() {
                            debug!(player_id = %player_id, "Arena channel closed");
                            return LeaveReason::Closed;
                        }
                    }
                    Err(e) => {
                        debug!(player_id = %player_id, error = %e, "Ignoring malformed client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                return LeaveReason::Closed;
            }
            Err(e) => {
                debug!(player_id = %player_id, error = %e, "WebSocket error");
                return LeaveReason::Closed;
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
