//! SQLite persistence: schema, settings store and per-user records

pub mod init;
pub mod kv;
pub mod retry;
pub mod user_data;

pub use init::{init_database, init_memory_database};
pub use kv::{get_json, set_json};
pub use retry::retry_with_backoff;
