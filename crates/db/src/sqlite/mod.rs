//! SQLite-Backend-Implementierungen fuer alle Repository-Traits

pub mod admin;
pub mod groups;
pub mod messages;
pub mod pool;
pub mod relations;
pub mod users;

pub use pool::SqliteDb;
