//! RPC server: accepts framed connections and dispatches requests to an
//! injected service.

use crate::codec::{Frame, FrameCodec};
use crate::error::RpcError;
use crate::message::{RpcRequest, RpcResponse};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

/// Capacity of each connection's response write queue.
const WRITE_BUFFER: usize = 256;

/// What an RPC endpoint exposes. One implementation per service role.
#[async_trait]
pub trait RpcService: Send + Sync + 'static {
    /// Execute `method`. An `Err` becomes a failure reply on the wire; the
    /// connection stays up.
    async fn call(&self, method: &str, params: serde_json::Value)
        -> Result<serde_json::Value, RpcError>;
}

/// Serve `service` on `addr` until `shutdown` fires.
pub async fn serve(
    addr: &str,
    service: Arc<dyn RpcService>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, service, shutdown).await
}

/// Serve on an already-bound listener (lets callers pick an ephemeral
/// port).
pub async fn serve_listener(
    listener: TcpListener,
    service: Arc<dyn RpcService>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, "rpc server listening");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                tracing::info!(addr = %addr, "rpc server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(peer = %peer, "rpc connection accepted");
                        let service = service.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, service, shutdown).await;
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "rpc accept failed");
                    }
                }
            }
        }
    }
}

/// Per-connection loop: requests run concurrently, responses funnel through
/// one writer so frames never interleave.
async fn handle_connection(
    stream: TcpStream,
    service: Arc<dyn RpcService>,
    shutdown: CancellationToken,
) {
    stream.set_nodelay(true).ok();
    let (mut sink, mut source) = Framed::new(stream, FrameCodec).split();
    let (write_tx, mut write_rx) = mpsc::channel::<RpcResponse>(WRITE_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(response) = write_rx.recv().await {
            let payload = match serde_json::to_vec(&response) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(error = %e, "unserializable rpc response");
                    continue;
                }
            };
            if sink.send(Frame::new(payload)).await.is_err() {
                break;
            }
        }
    });

    loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => break,
            received = source.next() => match received {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "rpc connection read error");
                    break;
                }
                None => break,
            },
        };

        let request = match serde_json::from_slice::<RpcRequest>(&frame.payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "undecodable rpc request, closing connection");
                break;
            }
        };

        let service = service.clone();
        let write_tx = write_tx.clone();
        tokio::spawn(async move {
            let id = request.id;
            let response = match service.call(&request.method, request.params).await {
                Ok(body) => RpcResponse::ok(id, body),
                Err(e) => {
                    tracing::debug!(method = %request.method, error = %e, "rpc method failed");
                    RpcResponse::fail(id, e.to_string())
                }
            };
            let _ = write_tx.send(response).await;
        });
    }

    drop(write_tx);
    writer.await.ok();
}
