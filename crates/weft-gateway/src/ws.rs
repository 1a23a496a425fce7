//! WebSocket listener: admission, the first-frame handshake, and the
//! per-socket read/write pumps.

use crate::operator::OperatorError;
use crate::server::{GatewayServer, ServerOptions};
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use weft_core::proto::ConnectRequest;

/// Shared state of the WebSocket router.
#[derive(Clone)]
pub struct WsState {
    pub server: Arc<GatewayServer>,
}

/// Build the WebSocket application.
pub fn create_app(server: Arc<GatewayServer>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(WsState { server })
}

async fn health_check() -> &'static str {
    "OK"
}

async fn ws_handler(State(state): State<WsState>, ws: WebSocketUpgrade) -> Response {
    // Admission before the upgrade: the cap bounds socket count, not
    // upgrade attempts.
    if !state.server.try_acquire() {
        tracing::warn!(
            active = state.server.active_connections(),
            "connection refused: at capacity"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    }

    let max_frame = state.server.options().max_message_size;
    ws.max_message_size(max_frame)
        .on_upgrade(move |socket| async move {
            handle_socket(state.server.clone(), socket).await;
            state.server.release();
        })
        .into_response()
}

async fn handle_socket(server: Arc<GatewayServer>, socket: WebSocket) {
    let options = server.options().clone();
    let (mut sink, mut stream) = socket.split();

    // First frame: {authToken, roomId}. serverId is ours to fill.
    let connect_req = match read_handshake(&mut stream, &options).await {
        Ok(mut req) => {
            req.server_id = server.server_id().to_string();
            req
        }
        Err(close) => {
            let _ = sink.send(Message::Close(Some(close))).await;
            return;
        }
    };

    let room_id = connect_req.room_id;
    let user_id = match server.operator().connect(&connect_req).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::debug!(error = %e, "websocket auth failed");
            let _ = sink.send(Message::Close(Some(close_for(&e)))).await;
            return;
        }
    };

    tracing::debug!(user_id, room_id, "websocket channel authenticated");

    let (tx, rx) = mpsc::channel(options.broadcast_size);
    let done = CancellationToken::new();
    let channel = server.register(user_id, room_id, tx, done.clone());

    let writer = tokio::spawn(write_pump(sink, rx, done.clone(), options.clone()));

    read_pump(&mut stream, &done, &options).await;

    // Socket is gone (or we were evicted): tear down in order.
    done.cancel();
    if server.unregister(&channel) {
        if let Err(e) = server.operator().disconnect(room_id, user_id).await {
            tracing::warn!(user_id, room_id, error = %e, "disconnect rpc failed");
        }
    }
    writer.await.ok();

    tracing::debug!(user_id, room_id, "websocket channel closed");
}

/// Read frames until the first text frame, bounded by the read deadline.
async fn read_handshake(
    stream: &mut SplitStream<WebSocket>,
    options: &ServerOptions,
) -> Result<ConnectRequest, CloseFrame> {
    loop {
        let message = match tokio::time::timeout(options.pong_wait, stream.next()).await {
            Ok(Some(Ok(message))) => message,
            _ => {
                return Err(CloseFrame {
                    code: close_code::POLICY,
                    reason: "handshake timeout".into(),
                })
            }
        };

        match message {
            Message::Text(text) => {
                let req: ConnectRequest = serde_json::from_str(text.as_str()).map_err(|_| {
                    CloseFrame {
                        code: close_code::POLICY,
                        reason: "invalid handshake".into(),
                    }
                })?;
                if req.auth_token.is_empty() {
                    return Err(CloseFrame {
                        code: close_code::POLICY,
                        reason: "invalid token".into(),
                    });
                }
                return Ok(req);
            }
            Message::Close(_) => {
                return Err(CloseFrame {
                    code: close_code::NORMAL,
                    reason: "".into(),
                })
            }
            // Control frames may precede the handshake.
            _ => {}
        }
    }
}

fn close_for(err: &OperatorError) -> CloseFrame {
    match err {
        OperatorError::InvalidToken => CloseFrame {
            code: close_code::POLICY,
            reason: "invalid token".into(),
        },
        OperatorError::Backend(_) => CloseFrame {
            code: close_code::ERROR,
            reason: "auth failed".into(),
        },
    }
}

/// Drain the socket, re-arming the read deadline on every inbound frame
/// (pongs included). Exits on deadline, socket error, client close, or the
/// done-signal.
async fn read_pump(
    stream: &mut SplitStream<WebSocket>,
    done: &CancellationToken,
    options: &ServerOptions,
) {
    loop {
        tokio::select! {
            () = done.cancelled() => return,
            read = tokio::time::timeout(options.pong_wait, stream.next()) => {
                match read {
                    Err(_) => {
                        tracing::debug!("read deadline exceeded");
                        return;
                    }
                    Ok(None) => return,
                    Ok(Some(Err(e))) => {
                        tracing::debug!(error = %e, "websocket read error");
                        return;
                    }
                    Ok(Some(Ok(Message::Close(_)))) => return,
                    Ok(Some(Ok(Message::Pong(_)))) => {
                        tracing::trace!("pong received");
                    }
                    // Client payloads after the handshake only refresh the
                    // deadline; sends go through the HTTP front-end.
                    Ok(Some(Ok(_))) => {}
                }
            }
        }
    }
}

/// Pull outbound frames in FIFO order, ping on the period, and close when
/// the done-signal fires or the queue closes. Every write carries the
/// write deadline.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    done: CancellationToken,
    options: ServerOptions,
) {
    let mut ping = tokio::time::interval(options.ping_period);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first interval tick is immediate; skip it so pings start one
    // period in.
    ping.tick().await;

    loop {
        tokio::select! {
            () = done.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                match tokio::time::timeout(
                    options.write_wait,
                    sink.send(Message::Text(frame.into())),
                )
                .await
                {
                    Ok(Ok(())) => {}
                    _ => {
                        tracing::debug!("websocket write failed or timed out");
                        break;
                    }
                }
            }
            _ = ping.tick() => {
                match tokio::time::timeout(
                    options.write_wait,
                    sink.send(Message::Ping(Default::default())),
                )
                .await
                {
                    Ok(Ok(())) => {}
                    _ => {
                        tracing::debug!("ping write failed or timed out");
                        break;
                    }
                }
            }
        }
    }

    let _ = sink.close().await;
}
