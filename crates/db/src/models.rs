//! Datenbankmodelle fuer Plauder
//!
//! Diese Typen repraesentieren Datensaetze aus der Datenbank.
//! Sie sind von den Protokoll-Typen getrennt und dienen als reine Datenuebertragungsobjekte.

use chrono::{DateTime, Utc};
use plauder_core::{
    BenutzerStatus, Freigabe, GroupId, GruppenRolle, MessageId, NachrichtenStatus,
    NachrichtenTyp, UserId,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Benutzer-Datensatz aus der Datenbank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: UserId,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub status: BenutzerStatus,
    pub created_at: DateTime<Utc>,
}

impl BenutzerRecord {
    /// Vollstaendiger Name wenn gesetzt, sonst Benutzername
    pub fn anzeigename(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Daten zum Erstellen eines neuen Benutzers
#[derive(Debug, Clone)]
pub struct NeuerBenutzer<'a> {
    pub username: &'a str,
    pub full_name: Option<&'a str>,
    pub avatar: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Kontaktbeziehungen
// ---------------------------------------------------------------------------

/// Eine gerichtete Kontaktbeziehung (`user_id` hat `friend_id` als Kontakt)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeziehungRecord {
    pub user_id: UserId,
    pub friend_id: UserId,
    pub approval_status: Freigabe,
    pub is_blocked: bool,
    pub blocked_by_user_id: Option<UserId>,
    pub is_deleted: bool,
    pub deleted_by_user_id: Option<UserId>,
}

impl BeziehungRecord {
    /// Wer blockiert hat; ohne Angabe gilt der Besitzer der Zeile
    pub fn blockiert_von(&self) -> Option<UserId> {
        self.is_blocked
            .then(|| self.blocked_by_user_id.unwrap_or(self.user_id))
    }

    /// Wer geloescht hat; ohne Angabe gilt der Besitzer der Zeile
    pub fn geloescht_von(&self) -> Option<UserId> {
        self.is_deleted
            .then(|| self.deleted_by_user_id.unwrap_or(self.user_id))
    }
}

// ---------------------------------------------------------------------------
// Gruppen
// ---------------------------------------------------------------------------

/// Anzeige-Informationen eines Gruppenmitglieds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MitgliedsAnzeige {
    pub nickname: Option<String>,
    pub full_name: Option<String>,
    pub username: String,
    pub avatar: Option<String>,
}

impl MitgliedsAnzeige {
    /// Gruppen-Spitzname > vollstaendiger Name > Benutzername
    pub fn anzeigename(&self) -> &str {
        [self.nickname.as_deref(), self.full_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

// ---------------------------------------------------------------------------
// Private Nachrichten
// ---------------------------------------------------------------------------

/// Gespeicherte private Nachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NachrichtRecord {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub sender_name: String,
    pub receiver_name: String,
    pub sender_avatar: Option<String>,
    pub receiver_avatar: Option<String>,
    pub content: String,
    pub message_type: NachrichtenTyp,
    pub file_name: Option<String>,
    pub quoted_message_id: Option<MessageId>,
    pub quoted_message_content: Option<String>,
    pub call_type: Option<String>,
    pub voice_duration: Option<i64>,
    pub status: NachrichtenStatus,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub deleted_by_users: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Speichern einer neuen privaten Nachricht
///
/// Namen und Avatare werden beim Speichern aus den Profilen uebernommen.
#[derive(Debug, Clone)]
pub struct NeueNachricht<'a> {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: &'a str,
    pub message_type: NachrichtenTyp,
    pub file_name: Option<&'a str>,
    pub quoted_message_id: Option<MessageId>,
    pub quoted_message_content: Option<&'a str>,
    pub call_type: Option<&'a str>,
    pub voice_duration: Option<i64>,
}

impl<'a> NeueNachricht<'a> {
    /// Einfache Textnachricht (fuer Tests und Systemnachrichten)
    pub fn text(sender_id: UserId, receiver_id: UserId, content: &'a str) -> Self {
        Self::mit_typ(sender_id, receiver_id, content, NachrichtenTyp::Text)
    }

    pub fn mit_typ(
        sender_id: UserId,
        receiver_id: UserId,
        content: &'a str,
        message_type: NachrichtenTyp,
    ) -> Self {
        Self {
            sender_id,
            receiver_id,
            content,
            message_type,
            file_name: None,
            quoted_message_id: None,
            quoted_message_content: None,
            call_type: None,
            voice_duration: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Gruppennachrichten
// ---------------------------------------------------------------------------

/// Gespeicherte Gruppennachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GruppenNachrichtRecord {
    pub id: MessageId,
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub sender_nickname: Option<String>,
    pub sender_full_name: Option<String>,
    pub sender_avatar: Option<String>,
    pub content: String,
    pub message_type: NachrichtenTyp,
    pub file_name: Option<String>,
    pub quoted_message_id: Option<MessageId>,
    pub quoted_message_content: Option<String>,
    pub mentioned_user_ids: Vec<UserId>,
    pub mentions: Option<String>,
    pub voice_duration: Option<i64>,
    pub status: NachrichtenStatus,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Speichern einer neuen Gruppennachricht
#[derive(Debug, Clone)]
pub struct NeueGruppenNachricht<'a> {
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub sender_name: &'a str,
    pub sender_nickname: Option<&'a str>,
    pub sender_full_name: Option<&'a str>,
    pub sender_avatar: Option<&'a str>,
    pub content: &'a str,
    pub message_type: NachrichtenTyp,
    pub file_name: Option<&'a str>,
    pub quoted_message_id: Option<MessageId>,
    pub quoted_message_content: Option<&'a str>,
    pub mentioned_user_ids: &'a [UserId],
    pub mentions: Option<&'a str>,
    pub voice_duration: Option<i64>,
}

/// Rolle und Stummschaltung eines Mitglieds (Verwaltung)
#[derive(Debug, Clone)]
pub struct NeuesMitglied<'a> {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: GruppenRolle,
    pub nickname: Option<&'a str>,
}
