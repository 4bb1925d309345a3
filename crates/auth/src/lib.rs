//! plauder-auth – Token-Pruefung fuer Echtzeit-Verbindungen
//!
//! Dieses Crate implementiert:
//! - Session-Token-Verwaltung (in-memory mit TTL)
//! - den `TokenPruefer`-Trait, ueber den der WebSocket-Endpunkt ein Token
//!   vor dem Upgrade einem Benutzer zuordnet

pub mod error;
pub mod pruefer;
pub mod session;

// Bequeme Re-Exporte
pub use error::{AuthError, AuthResult};
pub use pruefer::{token_bereinigen, TokenPruefer};
pub use session::{Session, SessionStore};
