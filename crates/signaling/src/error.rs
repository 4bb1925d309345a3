//! Fehlertypen fuer den Signaling-Service
//!
//! Fehler einzelner Umschlaege (Datenbank, Protokoll) werden in den
//! Handlern geloggt oder als Fehler-Umschlag an den Absender gemeldet und
//! verlassen den Router nicht.

use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Der Registry-Task laeuft nicht mehr
    #[error("Session-Registry beendet")]
    RegistryBeendet,

    /// Die Session wurde vor dem Eintragen geschlossen
    #[error("Session bereits geschlossen")]
    SessionGeschlossen,
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
