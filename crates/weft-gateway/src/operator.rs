//! The gateway's capability interface onto the directory.
//!
//! Two methods are all a socket's lifecycle needs; keeping them behind a
//! trait lets tests register sockets without a live directory.

use async_trait::async_trait;
use weft_core::proto::ConnectRequest;
use weft_directory::DirectoryClient;

/// Why a connect attempt failed, mapped to the close frame the client gets.
#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    /// Token rejected: close with a policy-violation frame.
    #[error("invalid auth token")]
    InvalidToken,

    /// Directory unreachable or failing: close with an internal-error
    /// frame.
    #[error("directory error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Operator: Send + Sync {
    /// Authenticate a first frame and register the roster entry. Returns
    /// the user id.
    async fn connect(&self, req: &ConnectRequest) -> Result<i64, OperatorError>;

    /// Tear down the roster entry for a departed socket.
    async fn disconnect(&self, room_id: i64, user_id: i64) -> Result<(), OperatorError>;
}

/// Production operator: directory RPC.
pub struct DirectoryOperator {
    client: DirectoryClient,
}

impl DirectoryOperator {
    #[must_use]
    pub fn new(client: DirectoryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Operator for DirectoryOperator {
    async fn connect(&self, req: &ConnectRequest) -> Result<i64, OperatorError> {
        let reply = self
            .client
            .connect(req)
            .await
            .map_err(|e| OperatorError::Backend(e.to_string()))?;
        if reply.user_id == 0 {
            return Err(OperatorError::InvalidToken);
        }
        Ok(reply.user_id)
    }

    async fn disconnect(&self, room_id: i64, user_id: i64) -> Result<(), OperatorError> {
        self.client
            .disconnect(room_id, user_id)
            .await
            .map_err(|e| OperatorError::Backend(e.to_string()))?;
        Ok(())
    }
}
