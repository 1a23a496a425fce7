//! Integration test utilities for the weft services.
//!
//! These helpers run the directory and the HTTP front-end in-process
//! against real PostgreSQL and Redis instances, and skip cleanly when
//! neither is available.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
