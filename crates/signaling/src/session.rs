//! Session – Zustand einer einzelnen authentifizierten Verbindung
//!
//! Eine Session gehoert genau einer Verbindung. Sie besitzt die ausgehende
//! Queue (gelesen von der Schreibschleife des Adapters), den Zaehler
//! verpasster Heartbeats und das Geschlossen-Flag. Eine geschlossene Session
//! kommt nie wieder in die Registry; jede Verbindung bekommt eine neue.

use bytes::Bytes;
use parking_lot::Mutex;
use plauder_core::{SessionId, UserId};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Standard-Groesse der ausgehenden Queue
pub const DEFAULT_QUEUE_GROESSE: usize = 256;

/// Ergebnis eines nicht-blockierenden Einreihens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Einreihen {
    Ok,
    /// Queue voll, die Nachricht wurde nicht eingereiht
    Voll,
    /// Session bereits geschlossen
    Geschlossen,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    /// `None` sobald die Session geschlossen ist
    outbound: Mutex<Option<mpsc::Sender<Bytes>>>,
    verpasste_heartbeats: AtomicU32,
    geschlossen: AtomicBool,
}

impl Session {
    /// Erstellt eine neue Session samt Empfangsseite der ausgehenden Queue
    pub fn neu(user_id: UserId, queue_groesse: usize) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(queue_groesse.max(1));
        let session = Arc::new(Self {
            id: SessionId::new(),
            user_id,
            outbound: Mutex::new(Some(tx)),
            verpasste_heartbeats: AtomicU32::new(0),
            geschlossen: AtomicBool::new(false),
        });
        (session, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Reiht Daten ein ohne zu warten
    pub fn einreihen(&self, daten: Bytes) -> Einreihen {
        let guard = self.outbound.lock();
        let Some(tx) = guard.as_ref() else {
            return Einreihen::Geschlossen;
        };
        match tx.try_send(daten) {
            Ok(()) => Einreihen::Ok,
            Err(mpsc::error::TrySendError::Full(_)) => Einreihen::Voll,
            Err(mpsc::error::TrySendError::Closed(_)) => Einreihen::Geschlossen,
        }
    }

    /// Reiht Daten ein und wartet hoechstens `timeout` auf Platz
    pub async fn einreihen_mit_timeout(&self, daten: Bytes, timeout: Duration) -> bool {
        let tx = match self.outbound.lock().as_ref() {
            Some(tx) => tx.clone(),
            None => return false,
        };
        tx.send_timeout(daten, timeout).await.is_ok()
    }

    /// Schliesst die Session und damit ihre ausgehende Queue
    ///
    /// Gibt nur beim ersten Aufruf `true` zurueck.
    pub fn schliessen(&self) -> bool {
        if self
            .geschlossen
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.outbound.lock().take();
        tracing::debug!(user_id = %self.user_id, session = %self.id, "Session geschlossen");
        true
    }

    pub fn ist_geschlossen(&self) -> bool {
        self.geschlossen.load(Ordering::Acquire)
    }

    /// Aufgerufen bei jedem `ping` des Clients
    pub fn heartbeat_zuruecksetzen(&self) {
        self.verpasste_heartbeats.store(0, Ordering::Relaxed);
    }

    /// Erhoeht den Zaehler um eins und gibt den neuen Wert zurueck
    pub fn heartbeat_altern(&self) -> u32 {
        self.verpasste_heartbeats.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn verpasste_heartbeats(&self) -> u32 {
        self.verpasste_heartbeats.load(Ordering::Relaxed)
    }
}
