//! # weft-dispatcher
//!
//! The dispatcher (task) role: drains the queue, resolves recipients
//! through the roster, and fans out to gateways over RPC, coalescing
//! high-frequency roster updates.

pub mod coalesce;
pub mod push;

pub use coalesce::{RoomInfoCoalescer, Snapshot, MIN_INTERVAL};
pub use push::Pusher;
