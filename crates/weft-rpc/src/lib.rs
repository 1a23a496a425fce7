//! # weft-rpc
//!
//! Internal RPC plumbing: the length-prefixed frame codec (shared with the
//! client framed-TCP protocol), a pipelined JSON RPC client and server, and
//! gateway discovery with round-robin client selection.

pub mod client;
pub mod codec;
pub mod discovery;
pub mod error;
pub mod message;
pub mod server;

pub use client::RpcClient;
pub use codec::{Frame, FrameCodec, FRAME_VERSION, HEADER_LEN, MAX_PAYLOAD_LEN};
pub use discovery::{GatewayRegistration, GatewayWatcher, RpcRegistry};
pub use error::RpcError;
pub use message::{RpcRequest, RpcResponse};
pub use server::{serve, serve_listener, RpcService};
