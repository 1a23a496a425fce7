//! # weft-directory
//!
//! The directory (logic) service: credentials and sessions, the
//! authoritative room roster, message persistence, and envelope publishing.
//! Also exports the typed [`DirectoryClient`] other services call it with.

pub mod auth;
pub mod client;
pub mod rpc;
pub mod service;

pub use client::DirectoryClient;
pub use rpc::DirectoryRpc;
pub use service::DirectoryService;
