//! plauder-signaling – Echtzeit-Transport fuer Plauder
//!
//! Dieser Crate implementiert den WebSocket-Endpunkt, die Session-Registry
//! (hoechstens eine Verbindung pro Benutzer), den Nachrichten-Router und
//! die Liveness-Pruefung.
//!
//! ## Architektur
//!
//! ```text
//! ws_router (Axum, Token-Pruefung vor dem Upgrade)
//!     |
//!     v
//! verbindung_betreiben (pro Verbindung: Lese- und Schreibschleife)
//!     |                         ^
//!     v                         | Session-Queue (begrenzt)
//! MessageDispatcher             |
//!     |                   SessionRegistry (Aktor, besitzt die Map)
//!     +-- nachricht_handler     ^      |
//!     +-- gruppen_handler       |      +-- OfflineBeobachter (PresenzDienst)
//!     +-- lese_handler          |
//!     +-- status_handler   LivenessMonitor (periodische Heartbeat-Pruefung)
//!     +-- anruf_handler
//!
//! AufgabenPool – begrenzte Fire-and-Forget-Aufgaben
//! AnrufEndeDedup – Anruf-Ende-Nachrichten innerhalb eines Fensters
//! ```

pub mod aufgaben;
pub mod connection;
pub mod dedup;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod liveness;
pub mod presence;
pub mod registry;
pub mod server_state;
pub mod session;
pub mod umwandlung;
pub mod ws;

// Bequeme Re-Exporte
pub use aufgaben::AufgabenPool;
pub use connection::{verbindung_betreiben, UmschlagVerarbeiter, VerbindungsConfig};
pub use dedup::{AnrufEndeDedup, Gespeichert};
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use liveness::LivenessMonitor;
pub use presence::PresenzDienst;
pub use registry::{OfflineBeobachter, RegistryConfig, SessionRegistry};
pub use server_state::{SignalingConfig, SignalingState};
pub use session::Session;
pub use ws::ws_router;
