//! plauder-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Plauder-Crates gemeinsam genutzt werden: ID-Newtypes, die
//! fachlichen Aufzaehlungen (Nachrichtentyp, Status, Rollen) und den
//! zentralen Fehler-Enum.

pub mod error;
pub mod modell;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{PlauderError, Result};
pub use modell::{BenutzerStatus, Freigabe, GruppenRolle, NachrichtenStatus, NachrichtenTyp};
pub use types::{GroupId, MessageId, SessionId, UserId};
