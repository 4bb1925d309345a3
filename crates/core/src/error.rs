//! Fehlertypen fuer Plauder
//!
//! Die uebrigen Crates definieren eigene Fehler und binden diesen via
//! `#[from]` ein.

use thiserror::Error;

/// Globaler Result-Alias fuer Plauder
pub type Result<T> = std::result::Result<T, PlauderError>;

/// Crate-uebergreifende Fehler im Plauder-System
#[derive(Debug, Error)]
pub enum PlauderError {
    /// Gespeicherter oder empfangener String passt zu keinem Enum-Wert
    #[error("Unbekannter {art}: {wert}")]
    UnbekannterWert { art: &'static str, wert: String },
}

impl PlauderError {
    /// Fehler fuer einen String der keinem Enum-Wert entspricht
    pub fn unbekannt(art: &'static str, wert: impl Into<String>) -> Self {
        Self::UnbekannterWert {
            art,
            wert: wert.into(),
        }
    }
}
