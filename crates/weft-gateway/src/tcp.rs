//! Framed-TCP listener: the same channel lifecycle as the WebSocket path,
//! over length-prefixed packets.
//!
//! The first packet doubles as the handshake: a `SendTcp` payload with
//! `op = 1` carrying the auth token. Server frames mirror the WebSocket
//! JSON bodies; a heartbeat frame goes out every ping period and any
//! inbound packet refreshes the read deadline.

use crate::server::{GatewayServer, ServerOptions};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use weft_core::proto::{Send as SendPayload, SendTcp};
use weft_core::{Op, CODE_OK};
use weft_rpc::{Frame, FrameCodec};

/// Serve the framed-TCP endpoint until `shutdown` fires.
pub async fn serve(
    addr: &str,
    server: Arc<GatewayServer>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "tcp listener started");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                tracing::info!(addr = %addr, "tcp listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        if !server.try_acquire() {
                            tracing::warn!(peer = %peer, "tcp connection refused: at capacity");
                            drop(stream);
                            continue;
                        }
                        let server = server.clone();
                        tokio::spawn(async move {
                            handle_conn(server.clone(), stream).await;
                            server.release();
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "tcp accept failed");
                    }
                }
            }
        }
    }
}

async fn handle_conn(server: Arc<GatewayServer>, stream: TcpStream) {
    stream.set_nodelay(true).ok();
    let options = server.options().clone();
    let (sink, mut source) = Framed::new(stream, FrameCodec).split();

    // Handshake packet.
    let handshake = match tokio::time::timeout(options.pong_wait, source.next()).await {
        Ok(Some(Ok(frame))) => frame,
        _ => {
            tracing::debug!("tcp handshake timeout or read error");
            return;
        }
    };

    let Ok(first) = serde_json::from_slice::<SendTcp>(&handshake.payload) else {
        tracing::debug!("undecodable tcp handshake");
        return;
    };

    if first.send.op != Op::BuildTcpConn.code() || first.auth_token.is_empty() {
        tracing::debug!(op = first.send.op, "tcp handshake without auth");
        return;
    }

    let connect_req = weft_core::proto::ConnectRequest {
        auth_token: first.auth_token,
        room_id: first.send.room_id,
        server_id: server.server_id().to_string(),
    };

    let user_id = match server.operator().connect(&connect_req).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::debug!(error = %e, "tcp auth failed");
            return;
        }
    };

    let room_id = connect_req.room_id;
    tracing::debug!(user_id, room_id, "tcp channel authenticated");

    let (tx, rx) = mpsc::channel(options.broadcast_size);
    let done = CancellationToken::new();
    let channel = server.register(user_id, room_id, tx, done.clone());

    let writer = tokio::spawn(write_pump(sink, rx, done.clone(), options.clone()));

    read_pump(&mut source, &done, &options).await;

    done.cancel();
    if server.unregister(&channel) {
        if let Err(e) = server.operator().disconnect(room_id, user_id).await {
            tracing::warn!(user_id, room_id, error = %e, "disconnect rpc failed");
        }
    }
    writer.await.ok();

    tracing::debug!(user_id, room_id, "tcp channel closed");
}

/// Any inbound packet refreshes the read deadline.
async fn read_pump(
    source: &mut SplitStream<Framed<TcpStream, FrameCodec>>,
    done: &CancellationToken,
    options: &ServerOptions,
) {
    loop {
        tokio::select! {
            () = done.cancelled() => return,
            read = tokio::time::timeout(options.pong_wait, source.next()) => {
                match read {
                    Err(_) => {
                        tracing::debug!("tcp read deadline exceeded");
                        return;
                    }
                    Ok(None) => return,
                    Ok(Some(Err(e))) => {
                        tracing::debug!(error = %e, "tcp read error");
                        return;
                    }
                    Ok(Some(Ok(_))) => {
                        tracing::trace!("tcp keepalive packet");
                    }
                }
            }
        }
    }
}

async fn write_pump(
    mut sink: SplitSink<Framed<TcpStream, FrameCodec>, Frame>,
    mut rx: mpsc::Receiver<String>,
    done: CancellationToken,
    options: ServerOptions,
) {
    let mut ping = tokio::time::interval(options.ping_period);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ping.tick().await;

    loop {
        tokio::select! {
            () = done.cancelled() => break,
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                match tokio::time::timeout(
                    options.write_wait,
                    sink.send(Frame::new(frame.into_bytes())),
                )
                .await
                {
                    Ok(Ok(())) => {}
                    _ => {
                        tracing::debug!("tcp write failed or timed out");
                        break;
                    }
                }
            }
            _ = ping.tick() => {
                let heartbeat = heartbeat_frame();
                match tokio::time::timeout(options.write_wait, sink.send(heartbeat)).await {
                    Ok(Ok(())) => {}
                    _ => {
                        tracing::debug!("tcp heartbeat failed or timed out");
                        break;
                    }
                }
            }
        }
    }

    let _ = sink.close().await;
}

/// Server heartbeat: a `Send` body with the handshake op; clients treat it
/// as a keepalive.
fn heartbeat_frame() -> Frame {
    let payload = SendPayload {
        code: CODE_OK,
        msg: "ping".to_string(),
        op: Op::BuildTcpConn.code(),
        ..Default::default()
    };
    let bytes = serde_json::to_vec(&payload).unwrap_or_default();
    Frame::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_is_a_valid_send_payload() {
        let frame = heartbeat_frame();
        let parsed: SendPayload = serde_json::from_slice(&frame.payload).unwrap();
        assert_eq!(parsed.op, Op::BuildTcpConn.code());
        assert_eq!(parsed.msg, "ping");
    }
}
