//! # weft-db
//!
//! Relational storage over PostgreSQL: the pool, row models, and the
//! repository implementations backing the directory.
//!
//! Expected schema:
//! `user(id, user_name UNIQUE, password, create_time)` and
//! `message(id, from_user_id idx, from_user_name, to_user_id idx,
//! to_user_name, room_id idx, message_type, content,
//! content_type DEFAULT 'text', create_time idx)`.

pub mod models;
pub mod pool;
pub mod repositories;

pub use models::{MessageModel, UserModel};
pub use pool::{create_pool, DatabaseConfig};
pub use repositories::{PgMessageRepository, PgUserRepository};
