//! RPC error surface.

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("connect to {0} failed: {1}")]
    Connect(String, String),

    #[error("connection closed")]
    Closed,

    #[error("call timed out")]
    Timeout,

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("remote error (code {code}): {message}")]
    Remote { code: i32, message: String },

    #[error("no gateway registered for server id {0}")]
    NoEndpoint(String),

    #[error("unknown method {0}")]
    UnknownMethod(String),

    #[error("bad params: {0}")]
    BadParams(String),

    #[error("{0}")]
    Internal(String),
}
