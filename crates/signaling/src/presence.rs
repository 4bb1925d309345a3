//! Presenz – Online-/Offline-Wechsel und Offline-Nachrichten
//!
//! Der `PresenzDienst` ist der `OfflineBeobachter` der Registry. Beim
//! Verbindungsaufbau setzt er den Status `online`, benachrichtigt die
//! Kontakte und stellt ungelesene Nachrichten zu, die waehrend der
//! Abwesenheit eingegangen sind. Beim Abbau der letzten Session setzt er
//! `offline` und benachrichtigt die Kontakte.

use async_trait::async_trait;
use chrono::Utc;
use plauder_core::{BenutzerStatus, UserId};
use plauder_db::Datenbank;
use plauder_protocol::control::{OfflineHinweis, OnlineHinweis};
use plauder_protocol::{kodieren, Ausgehend};
use std::sync::Arc;

use crate::registry::{OfflineBeobachter, SessionRegistry};
use crate::umwandlung::{kurzinfo, nachricht_daten};

pub struct PresenzDienst {
    db: Arc<dyn Datenbank>,
    registry: SessionRegistry,
}

impl PresenzDienst {
    pub fn neu(db: Arc<dyn Datenbank>, registry: SessionRegistry) -> Self {
        Self { db, registry }
    }

    /// Nach erfolgreicher Registrierung einer neuen Session
    pub async fn verbunden(&self, user_id: UserId) {
        self.status_wechseln(user_id, BenutzerStatus::Online).await;
        self.offline_nachrichten_zustellen(user_id).await;
    }

    /// Sendet alle ausstehenden ungelesenen Nachrichten in einem Umschlag
    ///
    /// Gibt die Anzahl der zugestellten Nachrichten zurueck.
    pub async fn offline_nachrichten_zustellen(&self, user_id: UserId) -> usize {
        let ausstehend = match self.db.ausstehende_ungelesene(user_id).await {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(user_id = %user_id, fehler = %e, "Offline-Nachrichten nicht lesbar");
                return 0;
            }
        };
        if ausstehend.is_empty() {
            return 0;
        }

        let anzahl = ausstehend.len();
        let umschlag = Ausgehend::OfflineNachrichten(ausstehend.iter().map(nachricht_daten).collect());
        if self.registry.umschlag_senden(user_id, &umschlag).await {
            tracing::debug!(user_id = %user_id, anzahl, "Offline-Nachrichten zugestellt");
            anzahl
        } else {
            0
        }
    }

    async fn status_wechseln(&self, user_id: UserId, status: BenutzerStatus) {
        if let Err(e) = self.db.status_setzen(user_id, status).await {
            tracing::warn!(user_id = %user_id, fehler = %e, "Status konnte nicht gespeichert werden");
        }

        let profil = match self.db.profil(user_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                tracing::warn!(user_id = %user_id, "Profil fuer Presenz-Hinweis fehlt");
                return;
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, fehler = %e, "Profil nicht lesbar");
                return;
            }
        };

        let jetzt = Utc::now().timestamp();
        let umschlag = match status {
            BenutzerStatus::Offline => Ausgehend::OfflineHinweis(OfflineHinweis {
                benutzer: kurzinfo(&profil),
                offline_time: jetzt,
            }),
            _ => Ausgehend::OnlineHinweis(OnlineHinweis {
                benutzer: kurzinfo(&profil),
                online_time: jetzt,
            }),
        };
        self.an_kontakte(user_id, &umschlag).await;
    }

    /// Sendet an alle bestaetigten Kontakte die online sind
    pub async fn an_kontakte(&self, user_id: UserId, umschlag: &Ausgehend) -> usize {
        let kontakte = match self.db.kontakt_ids(user_id).await {
            Ok(k) => k,
            Err(e) => {
                tracing::error!(user_id = %user_id, fehler = %e, "Kontakte nicht lesbar");
                return 0;
            }
        };
        if kontakte.is_empty() {
            return 0;
        }
        match kodieren(umschlag) {
            Ok(daten) => self.registry.an_menge_senden(kontakte, daten, Some(user_id)).await,
            Err(e) => {
                tracing::error!(fehler = %e, "Presenz-Hinweis nicht kodierbar");
                0
            }
        }
    }
}

#[async_trait]
impl OfflineBeobachter for PresenzDienst {
    async fn offline(&self, user_id: UserId) {
        // inzwischen wieder verbunden: kein Offline-Wechsel
        if self.registry.ist_online(user_id).await {
            tracing::debug!(user_id = %user_id, "Wieder online, Offline-Hinweis entfaellt");
            return;
        }
        tracing::info!(user_id = %user_id, "Benutzer offline");
        self.status_wechseln(user_id, BenutzerStatus::Offline).await;
    }
}
