//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt den Nachrichten-Router von der konkreten
//! Datenbank-Implementierung. Die Traits sind objektsicher (`async_trait`),
//! damit der Router sie als `Arc<dyn Datenbank>` halten kann.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plauder_core::{BenutzerStatus, GroupId, GruppenRolle, MessageId, NachrichtenTyp, UserId};

use crate::error::DbError;
use crate::models::{
    BenutzerRecord, BeziehungRecord, GruppenNachrichtRecord, MitgliedsAnzeige, NachrichtRecord,
    NeueGruppenNachricht, NeueNachricht,
};

/// Result-Alias fuer alle Repository-Operationen
pub type DbResult<T> = Result<T, DbError>;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://plauder.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus bei SQLite aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://plauder.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Private Nachrichten
#[async_trait]
pub trait NachrichtenRepository: Send + Sync {
    /// Speichert eine neue Nachricht, Namen und Avatare kommen aus den Profilen
    async fn erstellen(&self, daten: NeueNachricht<'_>) -> DbResult<NachrichtRecord>;

    /// Sucht die aelteste Nachricht des Paares (beide Richtungen) mit gleichem
    /// Typ und Inhalt, die nicht vor `seit` erstellt wurde
    async fn finde_aktuelles_duplikat(
        &self,
        a: UserId,
        b: UserId,
        typ: NachrichtenTyp,
        inhalt: &str,
        seit: DateTime<Utc>,
    ) -> DbResult<Option<MessageId>>;

    /// Markiert eine Nachricht als gelesen
    ///
    /// Gibt die Nachricht nur zurueck wenn sie an `leser` ging und vorher
    /// ungelesen war.
    async fn als_gelesen_markieren(
        &self,
        id: MessageId,
        leser: UserId,
    ) -> DbResult<Option<NachrichtRecord>>;

    /// Markiert alle ungelesenen Nachrichten von `sender` an `leser` als
    /// gelesen und gibt die Anzahl zurueck
    async fn alle_von_sender_gelesen(&self, leser: UserId, sender: UserId) -> DbResult<u64>;

    /// Ungelesene, nicht zurueckgerufene und nicht vom Empfaenger geloeschte
    /// Nachrichten, aelteste zuerst
    async fn ausstehende_ungelesene(&self, empfaenger: UserId) -> DbResult<Vec<NachrichtRecord>>;

    async fn nachricht_laden(&self, id: MessageId) -> DbResult<Option<NachrichtRecord>>;
}

/// Gruppen und Gruppennachrichten
#[async_trait]
pub trait GruppenRepository: Send + Sync {
    /// Unbekannte Gruppen gelten als nicht aufgeloest
    async fn ist_aufgeloest(&self, gruppe: GroupId) -> DbResult<bool>;

    async fn mitglieds_rolle(&self, gruppe: GroupId, user: UserId)
        -> DbResult<Option<GruppenRolle>>;

    async fn ist_stumm(&self, gruppe: GroupId, user: UserId) -> DbResult<bool>;

    async fn mitglied_anzeige(
        &self,
        gruppe: GroupId,
        user: UserId,
    ) -> DbResult<Option<MitgliedsAnzeige>>;

    async fn mitglieder_ids(&self, gruppe: GroupId) -> DbResult<Vec<UserId>>;

    async fn gruppen_nachricht_erstellen(
        &self,
        daten: NeueGruppenNachricht<'_>,
    ) -> DbResult<GruppenNachrichtRecord>;

    /// Traegt `leser` als Leser ein
    ///
    /// Gibt die Nachricht nur zurueck wenn der Eintrag neu ist, `leser`
    /// Mitglied der Gruppe und nicht selbst der Absender ist.
    async fn gruppen_nachricht_gelesen(
        &self,
        id: MessageId,
        leser: UserId,
    ) -> DbResult<Option<GruppenNachrichtRecord>>;
}

/// Kontaktbeziehungen (nur lesend)
#[async_trait]
pub trait BeziehungsRepository: Send + Sync {
    /// Beide gerichteten Zeilen zwischen `a` und `b` (0 bis 2 Eintraege)
    async fn beziehungen_zwischen(&self, a: UserId, b: UserId) -> DbResult<Vec<BeziehungRecord>>;

    /// Bestaetigte, nicht geloeschte Kontakte von `user`
    async fn kontakt_ids(&self, user: UserId) -> DbResult<Vec<UserId>>;
}

/// Benutzerprofile und Status
#[async_trait]
pub trait BenutzerRepository: Send + Sync {
    async fn profil(&self, id: UserId) -> DbResult<Option<BenutzerRecord>>;

    /// Setzt den dauerhaften Status, `NichtGefunden` bei unbekanntem Benutzer
    async fn status_setzen(&self, id: UserId, status: BenutzerStatus) -> DbResult<()>;
}

/// Alles was der Router von der Persistenz braucht
pub trait Datenbank:
    NachrichtenRepository + GruppenRepository + BeziehungsRepository + BenutzerRepository
{
}

impl<T> Datenbank for T where
    T: NachrichtenRepository + GruppenRepository + BeziehungsRepository + BenutzerRepository
{
}
