//! Session-Registry – wer ist gerade verbunden
//!
//! Die Tabelle `UserId -> Session` gehoert exklusiv einem einzigen Task
//! (`RegistryAktor`). Alle Zugriffe laufen als Befehl ueber einen Kanal und
//! werden dadurch in eine Reihenfolge gebracht. Pro Benutzer existiert zu
//! jedem Zeitpunkt hoechstens eine Session.
//!
//! ## Verdraengung bei erneuter Anmeldung
//! ```text
//! alte Session entfernen -> forced_logout (max. kick_timeout)
//!   -> alte Session schliessen -> kulanzzeit warten -> neue Session eintragen
//! ```
//! Der Aufrufer von `registrieren` erhaelt die Antwort erst nach dem Eintragen.

use async_trait::async_trait;
use bytes::Bytes;
use plauder_core::{SessionId, UserId};
use plauder_observability::PlauderMetrics;
use plauder_protocol::{kodieren, Ausgehend};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::aufgaben::AufgabenPool;
use crate::error::{SignalingError, SignalingResult};
use crate::session::{Einreihen, Session};

/// Groesse der Befehls-Queue
const BEFEHL_QUEUE_GROESSE: usize = 1024;

/// Wird aufgerufen wenn die letzte Session eines Benutzers abgebaut wurde
#[async_trait]
pub trait OfflineBeobachter: Send + Sync {
    async fn offline(&self, user_id: UserId);
}

/// Zeitgrenzen der Verdraengung
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Wie lange `forced_logout` auf Platz in der alten Queue warten darf
    pub kick_timeout: Duration,
    /// Pause zwischen Schliessen der alten und Eintragen der neuen Session
    pub kulanzzeit: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kick_timeout: Duration::from_millis(100),
            kulanzzeit: Duration::from_millis(100),
        }
    }
}

enum Befehl {
    Registrieren {
        session: Arc<Session>,
        antwort: oneshot::Sender<SignalingResult<()>>,
    },
    Abmelden {
        user_id: UserId,
        session_id: SessionId,
        antwort: oneshot::Sender<bool>,
    },
    AnUserSenden {
        user_id: UserId,
        daten: Bytes,
        antwort: oneshot::Sender<bool>,
    },
    AnMengeSenden {
        empfaenger: Vec<UserId>,
        daten: Bytes,
        ausgenommen: Option<UserId>,
        antwort: oneshot::Sender<usize>,
    },
    IstOnline {
        user_id: UserId,
        antwort: oneshot::Sender<bool>,
    },
    AktuelleSession {
        user_id: UserId,
        antwort: oneshot::Sender<Option<SessionId>>,
    },
    OnlineAnzahl {
        antwort: oneshot::Sender<usize>,
    },
    HeartbeatsPruefen {
        schwelle: u32,
        antwort: oneshot::Sender<Vec<UserId>>,
    },
    Herunterfahren {
        antwort: oneshot::Sender<()>,
    },
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Klonbares Handle auf den Registry-Task
#[derive(Clone)]
pub struct SessionRegistry {
    tx: mpsc::Sender<Befehl>,
}

impl SessionRegistry {
    /// Erstellt Handle und Aktor
    ///
    /// Das Handle ist sofort benutzbar; Befehle werden abgearbeitet sobald
    /// der Aktor mit `RegistryAktor::starten` laeuft.
    pub fn neu(config: RegistryConfig) -> (Self, RegistryAktor) {
        let (tx, rx) = mpsc::channel(BEFEHL_QUEUE_GROESSE);
        (Self { tx }, RegistryAktor { config, rx })
    }

    async fn anfrage<T>(
        &self,
        befehl: impl FnOnce(oneshot::Sender<T>) -> Befehl,
    ) -> SignalingResult<T> {
        let (antwort, rx) = oneshot::channel();
        self.tx
            .send(befehl(antwort))
            .await
            .map_err(|_| SignalingError::RegistryBeendet)?;
        rx.await.map_err(|_| SignalingError::RegistryBeendet)
    }

    /// Traegt eine neue Session ein und verdraengt eine vorhandene
    ///
    /// Eine bereits geschlossene Session wird abgelehnt
    /// (`SignalingError::SessionGeschlossen`).
    pub async fn registrieren(&self, session: Arc<Session>) -> SignalingResult<()> {
        self.anfrage(|antwort| Befehl::Registrieren { session, antwort })
            .await?
    }

    /// Entfernt die Session nur wenn sie noch die eingetragene ist
    pub async fn abmelden(&self, user_id: UserId, session_id: SessionId) -> bool {
        self.anfrage(|antwort| Befehl::Abmelden {
            user_id,
            session_id,
            antwort,
        })
        .await
        .unwrap_or(false)
    }

    /// Reiht `daten` beim Benutzer ein; `true` wenn er online war
    pub async fn an_user_senden(&self, user_id: UserId, daten: Bytes) -> bool {
        self.anfrage(|antwort| Befehl::AnUserSenden {
            user_id,
            daten,
            antwort,
        })
        .await
        .unwrap_or(false)
    }

    /// Kodiert und sendet einen Umschlag an einen Benutzer
    pub async fn umschlag_senden(&self, user_id: UserId, umschlag: &Ausgehend) -> bool {
        match kodieren(umschlag) {
            Ok(daten) => self.an_user_senden(user_id, daten).await,
            Err(e) => {
                tracing::error!(user_id = %user_id, fehler = %e, "Umschlag nicht kodierbar");
                false
            }
        }
    }

    /// Sendet an alle Online-Benutzer der Menge ausser `ausgenommen`
    ///
    /// Gibt die Anzahl der Zustellversuche zurueck.
    pub async fn an_menge_senden(
        &self,
        empfaenger: Vec<UserId>,
        daten: Bytes,
        ausgenommen: Option<UserId>,
    ) -> usize {
        self.anfrage(|antwort| Befehl::AnMengeSenden {
            empfaenger,
            daten,
            ausgenommen,
            antwort,
        })
        .await
        .unwrap_or(0)
    }

    pub async fn ist_online(&self, user_id: UserId) -> bool {
        self.anfrage(|antwort| Befehl::IstOnline { user_id, antwort })
            .await
            .unwrap_or(false)
    }

    pub async fn aktuelle_session(&self, user_id: UserId) -> Option<SessionId> {
        self.anfrage(|antwort| Befehl::AktuelleSession { user_id, antwort })
            .await
            .ok()
            .flatten()
    }

    pub async fn online_anzahl(&self) -> usize {
        self.anfrage(|antwort| Befehl::OnlineAnzahl { antwort })
            .await
            .unwrap_or(0)
    }

    /// Altert alle Zaehler und entfernt Sessions die `schwelle` erreicht haben
    pub async fn heartbeats_pruefen(&self, schwelle: u32) -> Vec<UserId> {
        self.anfrage(|antwort| Befehl::HeartbeatsPruefen { schwelle, antwort })
            .await
            .unwrap_or_default()
    }

    /// Schliesst alle Sessions und beendet den Aktor
    pub async fn herunterfahren(&self) {
        if self
            .anfrage(|antwort| Befehl::Herunterfahren { antwort })
            .await
            .is_err()
        {
            tracing::debug!("Registry war bereits beendet");
        }
    }
}

// ---------------------------------------------------------------------------
// Aktor
// ---------------------------------------------------------------------------

/// Der Task, dem die Session-Tabelle gehoert
pub struct RegistryAktor {
    config: RegistryConfig,
    rx: mpsc::Receiver<Befehl>,
}

struct AktorZustand {
    config: RegistryConfig,
    sessions: HashMap<UserId, Arc<Session>>,
    beobachter: Arc<dyn OfflineBeobachter>,
    aufgaben: AufgabenPool,
    metriken: Arc<PlauderMetrics>,
}

impl RegistryAktor {
    pub fn starten(
        self,
        beobachter: Arc<dyn OfflineBeobachter>,
        aufgaben: AufgabenPool,
        metriken: Arc<PlauderMetrics>,
    ) -> JoinHandle<()> {
        let mut zustand = AktorZustand {
            config: self.config,
            sessions: HashMap::new(),
            beobachter,
            aufgaben,
            metriken,
        };
        let mut rx = self.rx;

        tokio::spawn(async move {
            tracing::debug!("Session-Registry gestartet");
            while let Some(befehl) = rx.recv().await {
                if !zustand.ausfuehren(befehl).await {
                    break;
                }
            }
            zustand.alle_schliessen();
            tracing::info!("Session-Registry beendet");
        })
    }
}

impl AktorZustand {
    /// Gibt `false` zurueck wenn der Aktor enden soll
    async fn ausfuehren(&mut self, befehl: Befehl) -> bool {
        match befehl {
            Befehl::Registrieren { session, antwort } => {
                let ergebnis = self.registrieren(session).await;
                let _ = antwort.send(ergebnis);
            }
            Befehl::Abmelden {
                user_id,
                session_id,
                antwort,
            } => {
                let entfernt = match self.sessions.get(&user_id) {
                    Some(s) if s.id() == session_id => {
                        self.entfernen(user_id, None);
                        true
                    }
                    _ => false,
                };
                let _ = antwort.send(entfernt);
            }
            Befehl::AnUserSenden {
                user_id,
                daten,
                antwort,
            } => {
                let online = self.zustellen(user_id, daten);
                self.metriken.zustellung(online);
                let _ = antwort.send(online);
            }
            Befehl::AnMengeSenden {
                empfaenger,
                daten,
                ausgenommen,
                antwort,
            } => {
                let mut versuche = 0;
                for user_id in empfaenger {
                    if Some(user_id) == ausgenommen {
                        continue;
                    }
                    // Bytes-Klon teilt den Puffer
                    if self.zustellen(user_id, daten.clone()) {
                        versuche += 1;
                    }
                }
                let _ = antwort.send(versuche);
            }
            Befehl::IstOnline { user_id, antwort } => {
                let _ = antwort.send(self.sessions.contains_key(&user_id));
            }
            Befehl::AktuelleSession { user_id, antwort } => {
                let _ = antwort.send(self.sessions.get(&user_id).map(|s| s.id()));
            }
            Befehl::OnlineAnzahl { antwort } => {
                let _ = antwort.send(self.sessions.len());
            }
            Befehl::HeartbeatsPruefen { schwelle, antwort } => {
                let _ = antwort.send(self.heartbeats_pruefen(schwelle));
            }
            Befehl::Herunterfahren { antwort } => {
                self.alle_schliessen();
                let _ = antwort.send(());
                return false;
            }
        }
        true
    }

    async fn registrieren(&mut self, neu: Arc<Session>) -> SignalingResult<()> {
        let user_id = neu.user_id();

        if let Some(alt) = self.sessions.remove(&user_id) {
            tracing::info!(
                user_id = %user_id,
                alt = %alt.id(),
                neu = %neu.id(),
                "Neue Anmeldung verdraengt bestehende Session"
            );
            match kodieren(&Ausgehend::erzwungene_abmeldung()) {
                Ok(daten) => {
                    if !alt.einreihen_mit_timeout(daten, self.config.kick_timeout).await {
                        tracing::debug!(user_id = %user_id, "forced_logout nicht zustellbar");
                    }
                }
                Err(e) => tracing::error!(fehler = %e, "forced_logout nicht kodierbar"),
            }
            alt.schliessen();
            self.metriken.verdraengungen_total.inc();
            self.metriken.sessions_online.dec();
            tokio::time::sleep(self.config.kulanzzeit).await;
        }

        if neu.ist_geschlossen() {
            tracing::warn!(user_id = %user_id, "Geschlossene Session wird nicht eingetragen");
            return Err(SignalingError::SessionGeschlossen);
        }

        tracing::info!(user_id = %user_id, session = %neu.id(), "Session registriert");
        self.sessions.insert(user_id, neu);
        self.metriken.sessions_online.inc();
        Ok(())
    }

    /// Reiht ein; eine volle Queue kostet die Verbindung, nicht die Nachricht
    fn zustellen(&mut self, user_id: UserId, daten: Bytes) -> bool {
        let Some(session) = self.sessions.get(&user_id) else {
            return false;
        };
        match session.einreihen(daten) {
            Einreihen::Ok => {}
            Einreihen::Voll => {
                tracing::warn!(user_id = %user_id, "Ausgehende Queue voll, Session wird entfernt");
                self.entfernen(user_id, Some("queue_voll"));
            }
            Einreihen::Geschlossen => {
                tracing::debug!(user_id = %user_id, "Session bereits geschlossen, wird entfernt");
                self.entfernen(user_id, Some("geschlossen"));
            }
        }
        true
    }

    fn heartbeats_pruefen(&mut self, schwelle: u32) -> Vec<UserId> {
        let mut tot = Vec::new();
        for (user_id, session) in &self.sessions {
            if session.heartbeat_altern() >= schwelle {
                tot.push(*user_id);
            }
        }

        for user_id in &tot {
            tracing::info!(user_id = %user_id, "Keine Heartbeats, Session wird entfernt");
            self.entfernen(*user_id, Some("liveness"));
        }
        tot
    }

    /// Entfernt, schliesst und meldet den Benutzer offline
    fn entfernen(&mut self, user_id: UserId, grund: Option<&'static str>) {
        let Some(session) = self.sessions.remove(&user_id) else {
            return;
        };
        session.schliessen();
        self.metriken.sessions_online.dec();
        if let Some(grund) = grund {
            self.metriken.entfernung(grund);
        }

        let beobachter = Arc::clone(&self.beobachter);
        self.aufgaben.einreichen("offline_beobachter", async move {
            beobachter.offline(user_id).await;
        });
    }

    fn alle_schliessen(&mut self) {
        let anzahl = self.sessions.len();
        for (_, session) in self.sessions.drain() {
            session.schliessen();
        }
        self.metriken.sessions_online.set(0);
        if anzahl > 0 {
            tracing::info!(anzahl, "Alle Sessions geschlossen");
        }
    }
}
