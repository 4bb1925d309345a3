//! plauder-db – Datenbank-Abstraktion
//!
//! Dieses Crate stellt das Repository-Pattern bereit, ueber das der
//! Nachrichten-Router Nachrichten speichert und Beziehungen, Gruppen und
//! Profile liest. Die mitgelieferte Implementierung nutzt SQLite (WAL,
//! eingebettete Migrationen).

pub mod beziehung;
pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use beziehung::{bewerten, Ablehnung};
pub use error::DbError;
pub use repository::{
    BenutzerRepository, BeziehungsRepository, DatabaseConfig, Datenbank, DbResult,
    GruppenRepository, NachrichtenRepository,
};
pub use sqlite::SqliteDb;
