//! # weft-cache
//!
//! Shared KV over Redis: the connection pool, the session store, the room
//! roster, and the gateway discovery registry.

pub mod pool;
pub mod registry;
pub mod roster;
pub mod session;

pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};
pub use registry::{param_by_key, DiscoveryRegistry, Registration};
pub use roster::{RoomRosterStore, RosterEntry};
pub use session::{AuthInfo, SessionStore};
