//! Doppelte Anruf-Ende-Nachrichten vermeiden
//!
//! Beide Teilnehmer eines Anrufs melden dessen Ende oft fast gleichzeitig.
//! Eine `call_ended`/`call_ended_video`-Nachricht mit gleichem Paar (egal in
//! welcher Richtung), gleichem Typ und Inhalt innerhalb des Fensters wird
//! nicht neu gespeichert; die erste wird wiederverwendet. Pruefen und
//! Speichern laufen unter einer Sperre, damit zwei gleichzeitige Meldungen
//! nicht beide als neu gelten.

use chrono::Utc;
use plauder_core::MessageId;
use plauder_db::{models::NachrichtRecord, models::NeueNachricht, DbResult, NachrichtenRepository};
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_FENSTER: Duration = Duration::from_secs(10);

/// Ergebnis des Speicherns
#[derive(Debug, Clone, PartialEq)]
pub enum Gespeichert {
    Neu(NachrichtRecord),
    /// Bereits vorhandene Nachricht innerhalb des Fensters
    Duplikat(MessageId),
}

impl Gespeichert {
    pub fn message_id(&self) -> MessageId {
        match self {
            Self::Neu(r) => r.id,
            Self::Duplikat(id) => *id,
        }
    }
}

#[derive(Debug)]
pub struct AnrufEndeDedup {
    sperre: Mutex<()>,
    fenster: chrono::Duration,
}

impl AnrufEndeDedup {
    pub fn neu(fenster: Duration) -> Self {
        Self {
            sperre: Mutex::new(()),
            fenster: chrono::Duration::from_std(fenster)
                .unwrap_or_else(|_| chrono::Duration::seconds(10)),
        }
    }

    /// Speichert `daten`; Anruf-Ende-Nachrichten nur wenn kein Duplikat existiert
    pub async fn speichern<D>(&self, db: &D, daten: NeueNachricht<'_>) -> DbResult<Gespeichert>
    where
        D: NachrichtenRepository + ?Sized,
    {
        if !daten.message_type.ist_anruf_ende() {
            return Ok(Gespeichert::Neu(db.erstellen(daten).await?));
        }

        let _sperre = self.sperre.lock().await;
        let seit = Utc::now() - self.fenster;
        if let Some(id) = db
            .finde_aktuelles_duplikat(
                daten.sender_id,
                daten.receiver_id,
                daten.message_type,
                daten.content,
                seit,
            )
            .await?
        {
            tracing::debug!(
                message_id = %id,
                sender = %daten.sender_id,
                empfaenger = %daten.receiver_id,
                "Anruf-Ende bereits gespeichert"
            );
            return Ok(Gespeichert::Duplikat(id));
        }
        Ok(Gespeichert::Neu(db.erstellen(daten).await?))
    }
}

impl Default for AnrufEndeDedup {
    fn default() -> Self {
        Self::neu(DEFAULT_FENSTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plauder_core::{NachrichtenTyp, UserId};
    use plauder_db::{models::NeuerBenutzer, SqliteDb};
    use std::sync::Arc;

    async fn paar() -> (Arc<SqliteDb>, UserId, UserId) {
        let db = SqliteDb::in_memory().await.unwrap();
        let mut ids = Vec::new();
        for name in ["anna", "ben"] {
            ids.push(
                db.benutzer_anlegen(NeuerBenutzer {
                    username: name,
                    full_name: None,
                    avatar: None,
                })
                .await
                .unwrap()
                .id,
            );
        }
        (Arc::new(db), ids[0], ids[1])
    }

    #[tokio::test]
    async fn beide_seiten_melden_ende_einmal_gespeichert() {
        let (db, a, b) = paar().await;
        let dedup = AnrufEndeDedup::default();

        let erste = dedup
            .speichern(&*db, NeueNachricht::mit_typ(a, b, "02:05", NachrichtenTyp::CallEnded))
            .await
            .unwrap();
        let zweite = dedup
            .speichern(&*db, NeueNachricht::mit_typ(b, a, "02:05", NachrichtenTyp::CallEnded))
            .await
            .unwrap();

        assert!(matches!(erste, Gespeichert::Neu(_)));
        assert_eq!(zweite, Gespeichert::Duplikat(erste.message_id()));
    }

    #[tokio::test]
    async fn gleichzeitige_meldungen_ergeben_einen_datensatz() {
        let (db, a, b) = paar().await;
        let dedup = Arc::new(AnrufEndeDedup::default());

        let mut tasks = Vec::new();
        for (von, zu) in [(a, b), (b, a), (a, b), (b, a)] {
            let db = Arc::clone(&db);
            let dedup = Arc::clone(&dedup);
            tasks.push(tokio::spawn(async move {
                dedup
                    .speichern(
                        &*db,
                        NeueNachricht::mit_typ(von, zu, "00:42", NachrichtenTyp::CallEndedVideo),
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        let mut neu = 0;
        for t in tasks {
            let ergebnis = t.await.unwrap();
            if matches!(ergebnis, Gespeichert::Neu(_)) {
                neu += 1;
            }
            ids.push(ergebnis.message_id());
        }
        assert_eq!(neu, 1);
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn textnachrichten_werden_nie_zusammengefasst() {
        let (db, a, b) = paar().await;
        let dedup = AnrufEndeDedup::default();

        let x = dedup.speichern(&*db, NeueNachricht::text(a, b, "ok")).await.unwrap();
        let y = dedup.speichern(&*db, NeueNachricht::text(a, b, "ok")).await.unwrap();
        assert_ne!(x.message_id(), y.message_id());
    }

    #[tokio::test]
    async fn anderer_inhalt_ist_kein_duplikat() {
        let (db, a, b) = paar().await;
        let dedup = AnrufEndeDedup::default();

        let x = dedup
            .speichern(&*db, NeueNachricht::mit_typ(a, b, "01:00", NachrichtenTyp::CallEnded))
            .await
            .unwrap();
        let y = dedup
            .speichern(&*db, NeueNachricht::mit_typ(a, b, "01:01", NachrichtenTyp::CallEnded))
            .await
            .unwrap();
        assert_ne!(x.message_id(), y.message_id());
    }
}
