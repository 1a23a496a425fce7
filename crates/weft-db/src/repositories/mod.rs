//! Repository implementations over PostgreSQL.

mod error;
mod message;
mod user;

pub use error::map_db_error;
pub use message::PgMessageRepository;
pub use user::PgUserRepository;
