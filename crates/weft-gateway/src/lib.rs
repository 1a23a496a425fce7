//! # weft-gateway
//!
//! The gateway (connect) role: terminates WebSocket and framed-TCP client
//! sockets, shards them across lock-striped buckets, authenticates against
//! the directory, and serves the push RPCs the dispatcher fans out with.

pub mod bucket;
pub mod channel;
pub mod operator;
pub mod room;
pub mod rpc;
pub mod server;
pub mod tcp;
pub mod ws;

pub use bucket::{Bucket, PushOutcome};
pub use channel::{Channel, OfferError};
pub use operator::{DirectoryOperator, Operator, OperatorError};
pub use room::Room;
pub use rpc::GatewayRpc;
pub use server::{GatewayServer, ServerOptions};
