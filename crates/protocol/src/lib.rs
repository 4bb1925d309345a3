//! plauder-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Umschlaege die zwischen Client und Server
//! ueber die WebSocket-Verbindung ausgetauscht werden, sowie die
//! transportneutralen Frames des Verbindungsadapters.

pub mod control;
pub mod wire;

pub use control::{AnrufArt, AnrufSignal, Ausgehend, Eingehend, Fehlermeldung, Lesebestaetigung};
pub use wire::{dekodieren, kodieren, Frame, ProtokollFehler, DEFAULT_MAX_FRAME_SIZE};
