pub mod db;
pub mod store;

pub use db::{create_db, create_memory_db, DbPool};
pub use store::SqliteStore;
