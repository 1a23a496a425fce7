//! # weft-core
//!
//! Domain types shared by every weft service: operation codes, wire DTOs,
//! queue envelopes, entities, snowflake ids, and repository traits.

pub mod entity;
pub mod envelope;
pub mod ops;
pub mod proto;
pub mod snowflake;
pub mod traits;

pub use entity::{ChatMessage, User};
pub use envelope::{Msg, RouteMsg, RoomCountBody, RoomInfoBody};
pub use ops::{ContentType, Op, CODE_FAIL, CODE_OK, MSG_VERSION};
pub use snowflake::{Snowflake, SnowflakeGenerator};
pub use traits::{MessageRepository, RepoError, RepoResult, UserRepository};
