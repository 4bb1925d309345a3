//! Fehlertypen fuer die Token-Pruefung

use thiserror::Error;

/// Alle moeglichen Fehler bei der Authentifizierung einer Verbindung
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Kein Token angegeben")]
    TokenFehlt,

    #[error("Session nicht gefunden oder abgelaufen")]
    SessionUngueltig,

    #[error("Session abgelaufen")]
    SessionAbgelaufen,
}

/// Result-Alias fuer die Token-Pruefung
pub type AuthResult<T> = Result<T, AuthError>;
