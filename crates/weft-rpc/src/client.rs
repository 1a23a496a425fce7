//! Pipelined RPC client.
//!
//! One background task owns the framed TCP stream; callers submit requests
//! over a channel and await a oneshot keyed by request id, so many calls can
//! be in flight at once. The connection is dialed lazily and re-dialed by
//! the next call after a failure.

use crate::codec::{Frame, FrameCodec};
use crate::error::RpcError;
use crate::message::{RpcRequest, RpcResponse};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::codec::Framed;

type Pending = oneshot::Sender<Result<RpcResponse, RpcError>>;

/// Requests waiting for a connection-task slot.
const SUBMIT_BUFFER: usize = 256;

pub struct RpcClient {
    addr: String,
    timeout: Duration,
    next_id: AtomicU64,
    handle: Mutex<Option<mpsc::Sender<(RpcRequest, Pending)>>>,
}

impl RpcClient {
    /// Create a client for `addr`. No connection is made until the first
    /// call.
    #[must_use]
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            next_id: AtomicU64::new(1),
            handle: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Invoke `method` with `params`, decoding the reply body as `R`.
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<R, RpcError> {
        let request = RpcRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            params: serde_json::to_value(params)?,
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let submit = self.submitter().await?;
        if submit.send((request, reply_tx)).await.is_err() {
            // The connection task died since we fetched the sender; drop the
            // stale handle so the next call redials.
            self.handle.lock().await.take();
            return Err(RpcError::Closed);
        }

        let response = match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(RpcError::Closed),
            Err(_) => return Err(RpcError::Timeout),
        };

        if response.code != weft_core::CODE_OK {
            return Err(RpcError::Remote {
                code: response.code,
                message: response.message,
            });
        }

        Ok(serde_json::from_value(response.body)?)
    }

    /// Get the live submit channel, dialing if needed.
    async fn submitter(&self) -> Result<mpsc::Sender<(RpcRequest, Pending)>, RpcError> {
        let mut handle = self.handle.lock().await;
        if let Some(sender) = handle.as_ref() {
            if !sender.is_closed() {
                return Ok(sender.clone());
            }
        }

        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| RpcError::Connect(self.addr.clone(), e.to_string()))?;
        stream.set_nodelay(true).ok();

        let (tx, rx) = mpsc::channel(SUBMIT_BUFFER);
        tokio::spawn(connection_task(
            Framed::new(stream, FrameCodec),
            rx,
            self.addr.clone(),
        ));

        *handle = Some(tx.clone());
        tracing::debug!(addr = %self.addr, "rpc client connected");
        Ok(tx)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").field("addr", &self.addr).finish()
    }
}

/// Owns the socket: writes submitted requests, routes response frames back
/// to their oneshots. Exits on any stream error, failing all in-flight
/// calls.
async fn connection_task(
    mut framed: Framed<TcpStream, FrameCodec>,
    mut rx: mpsc::Receiver<(RpcRequest, Pending)>,
    addr: String,
) {
    let mut pending: HashMap<u64, Pending> = HashMap::new();

    loop {
        tokio::select! {
            submitted = rx.recv() => {
                let Some((request, reply)) = submitted else {
                    // Client dropped; nothing more to send.
                    break;
                };
                let payload = match serde_json::to_vec(&request) {
                    Ok(payload) => payload,
                    Err(e) => {
                        let _ = reply.send(Err(RpcError::Encode(e)));
                        continue;
                    }
                };
                let id = request.id;
                pending.insert(id, reply);
                if let Err(e) = framed.send(Frame::new(payload)).await {
                    tracing::warn!(addr = %addr, error = %e, "rpc write failed");
                    break;
                }
            }
            received = framed.next() => {
                let frame = match received {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        tracing::warn!(addr = %addr, error = %e, "rpc read failed");
                        break;
                    }
                    None => break,
                };
                match serde_json::from_slice::<RpcResponse>(&frame.payload) {
                    Ok(response) => {
                        if let Some(reply) = pending.remove(&response.id) {
                            let _ = reply.send(Ok(response));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(addr = %addr, error = %e, "undecodable rpc response");
                    }
                }
            }
        }
    }

    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(RpcError::Closed));
    }
}
