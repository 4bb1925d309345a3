//! Envelope-Protokoll (WebSocket, JSON)
//!
//! Definiert alle Nachrichten die ueber die WebSocket-Verbindung zwischen
//! Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Jede Nachricht ist ein Umschlag `{"type": <art>, "data": <nutzlast>}`
//! - Eingehend: `Eingehend`, wird in `wire::dekodieren` zweistufig gelesen
//!   (erst Art + rohe Daten, dann die typisierte Nutzlast)
//! - Ausgehend: `Ausgehend`, Tagged Enum (`tag = "type"`, `content = "data"`)
//! - Anruf-Signale werden nicht interpretiert, nur weitergereicht

use chrono::{DateTime, Utc};
use plauder_core::{BenutzerStatus, GroupId, MessageId, NachrichtenTyp, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status-Feld in Sendebestaetigungen
pub const STATUS_GESENDET: &str = "sent";

// ---------------------------------------------------------------------------
// Eingehend: Nutzlasten
// ---------------------------------------------------------------------------

/// Private Nachricht senden (`message`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NachrichtSenden {
    pub receiver_id: UserId,
    pub content: String,
    #[serde(default)]
    pub message_type: NachrichtenTyp,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub quoted_message_id: Option<MessageId>,
    #[serde(default)]
    pub quoted_message_content: Option<String>,
    #[serde(default)]
    pub call_type: Option<String>,
    #[serde(default)]
    pub voice_duration: Option<i64>,
}

/// Gruppennachricht senden (`group_message_send`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GruppenNachrichtSenden {
    pub group_id: GroupId,
    pub content: String,
    #[serde(default)]
    pub message_type: NachrichtenTyp,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub quoted_message_id: Option<MessageId>,
    #[serde(default)]
    pub quoted_message_content: Option<String>,
    #[serde(default)]
    pub mentioned_user_ids: Vec<UserId>,
    #[serde(default)]
    pub mentions: Option<String>,
    #[serde(default)]
    pub voice_duration: Option<i64>,
}

/// Rohform der Lesebestaetigung, genau eines der Felder muss gesetzt sein
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LesebestaetigungRoh {
    pub message_id: Option<MessageId>,
    pub sender_id: Option<UserId>,
    pub group_message_id: Option<MessageId>,
}

/// Lesebestaetigung (`read_receipt`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lesebestaetigung {
    /// Einzelne private Nachricht gelesen
    Einzeln(MessageId),
    /// Alle ungelesenen Nachrichten eines Absenders gelesen
    AlleVon(UserId),
    /// Einzelne Gruppennachricht gelesen
    Gruppe(MessageId),
}

/// Status aendern (`status_change`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusAendern {
    pub status: String,
}

/// Tipp-Anzeige (`typing_indicator`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TippAnzeige {
    pub receiver_id: UserId,
    pub is_typing: bool,
}

/// Art eines weitergereichten Anruf-Signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnrufArt {
    Offer,
    Answer,
    IceCandidate,
    CallRequest,
    CallAccepted,
    CallRejected,
    CallEnded,
}

impl AnrufArt {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
            Self::CallRequest => "call-request",
            Self::CallAccepted => "call-accepted",
            Self::CallRejected => "call-rejected",
            Self::CallEnded => "call-ended",
        }
    }

    pub fn aus_str(s: &str) -> Option<Self> {
        Some(match s {
            "offer" => Self::Offer,
            "answer" => Self::Answer,
            "ice-candidate" => Self::IceCandidate,
            "call-request" => Self::CallRequest,
            "call-accepted" => Self::CallAccepted,
            "call-rejected" => Self::CallRejected,
            "call-ended" => Self::CallEnded,
            _ => return None,
        })
    }
}

/// Anruf-Signal, Nutzlast bleibt uninterpretiert
#[derive(Debug, Clone, PartialEq)]
pub struct AnrufSignal {
    pub art: AnrufArt,
    /// Aus `targetUserId`
    pub ziel: UserId,
    pub daten: Map<String, Value>,
}

impl AnrufSignal {
    /// Baut das weiterzuleitende Signal mit `fromUserId` des Absenders
    pub fn weiterleiten(self, von: UserId) -> Ausgehend {
        let mut daten = self.daten;
        daten.insert("fromUserId".into(), Value::from(von.inner()));
        match self.art {
            AnrufArt::Offer => Ausgehend::Offer(daten),
            AnrufArt::Answer => Ausgehend::Answer(daten),
            AnrufArt::IceCandidate => Ausgehend::IceCandidate(daten),
            AnrufArt::CallRequest => Ausgehend::CallRequest(daten),
            AnrufArt::CallAccepted => Ausgehend::CallAccepted(daten),
            AnrufArt::CallRejected => Ausgehend::CallRejected(daten),
            AnrufArt::CallEnded => Ausgehend::CallEnded(daten),
        }
    }
}

// ---------------------------------------------------------------------------
// Eingehend: Haupt-Enum
// ---------------------------------------------------------------------------

/// Alle Nachrichten die ein Client senden kann
#[derive(Debug, Clone)]
pub enum Eingehend {
    Nachricht(NachrichtSenden),
    GruppenNachricht(GruppenNachrichtSenden),
    Lesebestaetigung(Lesebestaetigung),
    Ping,
    StatusAendern(StatusAendern),
    Tippen(TippAnzeige),
    Anruf(AnrufSignal),
}

impl Eingehend {
    /// Wire-Name der Nachrichtenart (fuer Logging und Metriken)
    pub fn art(&self) -> &'static str {
        match self {
            Self::Nachricht(_) => "message",
            Self::GruppenNachricht(_) => "group_message_send",
            Self::Lesebestaetigung(_) => "read_receipt",
            Self::Ping => "ping",
            Self::StatusAendern(_) => "status_change",
            Self::Tippen(_) => "typing_indicator",
            Self::Anruf(signal) => signal.art.als_str(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ausgehend: Nutzlasten
// ---------------------------------------------------------------------------

/// Vollstaendige private Nachricht wie sie an den Empfaenger geht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NachrichtDaten {
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
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Gruppennachricht wie sie an die Mitglieder geht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GruppenNachrichtDaten {
    pub id: MessageId,
    pub group_id: GroupId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
    pub content: String,
    pub message_type: NachrichtenTyp,
    pub file_name: Option<String>,
    pub quoted_message_id: Option<MessageId>,
    pub quoted_message_content: Option<String>,
    pub mentioned_user_ids: Vec<UserId>,
    pub mentions: Option<String>,
    pub voice_duration: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Sendebestaetigung fuer private Nachrichten
#[derive(Debug, Clone, Serialize)]
pub struct Gesendet {
    pub message_id: MessageId,
    pub status: &'static str,
}

/// Sendebestaetigung fuer Gruppennachrichten
#[derive(Debug, Clone, Serialize)]
pub struct GruppenGesendet {
    pub message_id: MessageId,
    pub group_id: GroupId,
    pub status: &'static str,
}

/// Typisierte Fehlermeldung an den Absender
#[derive(Debug, Clone, Serialize)]
pub struct Fehlermeldung {
    /// Maschinenlesbarer Code
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Fehlermeldung {
    pub fn neu(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            error,
            message: Some(message.into()),
        }
    }
}

/// Lesebestaetigung an den urspruenglichen Absender
#[derive(Debug, Clone, Serialize)]
pub struct LeseInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    /// Wer gelesen hat
    pub receiver_id: UserId,
}

/// Lesebestaetigung einer Gruppennachricht an deren Absender
#[derive(Debug, Clone, Serialize)]
pub struct GruppenLeseInfo {
    pub message_id: MessageId,
    pub group_id: GroupId,
    pub reader_id: UserId,
}

/// Oeffentliche Profilfelder fuer Status- und Presenz-Hinweise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenutzerKurzinfo {
    pub user_id: UserId,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub user_id: UserId,
    pub username: String,
    pub full_name: Option<String>,
    pub status: BenutzerStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnlineHinweis {
    #[serde(flatten)]
    pub benutzer: BenutzerKurzinfo,
    /// Unix-Sekunden
    pub online_time: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfflineHinweis {
    #[serde(flatten)]
    pub benutzer: BenutzerKurzinfo,
    /// Unix-Sekunden
    pub offline_time: i64,
}

// ---------------------------------------------------------------------------
// Ausgehend: Haupt-Enum
// ---------------------------------------------------------------------------

/// Alle Nachrichten die der Server an einen Client senden kann
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Ausgehend {
    #[serde(rename = "message")]
    Nachricht(NachrichtDaten),
    #[serde(rename = "message_sent")]
    NachrichtGesendet(Gesendet),
    #[serde(rename = "message_error")]
    NachrichtFehler(Fehlermeldung),

    #[serde(rename = "group_message")]
    GruppenNachricht(GruppenNachrichtDaten),
    #[serde(rename = "group_message_sent")]
    GruppenNachrichtGesendet(GruppenGesendet),
    #[serde(rename = "group_message_error")]
    GruppenNachrichtFehler(Fehlermeldung),

    #[serde(rename = "read_receipt")]
    Lesebestaetigung(LeseInfo),
    #[serde(rename = "group_read_receipt")]
    GruppenLesebestaetigung(GruppenLeseInfo),

    #[serde(rename = "pong")]
    Pong { timestamp: i64 },

    #[serde(rename = "status_change")]
    StatusAenderung(StatusInfo),
    #[serde(rename = "status_change_success")]
    StatusAenderungErfolg { status: BenutzerStatus },
    #[serde(rename = "status_change_error")]
    StatusAenderungFehler(Fehlermeldung),

    #[serde(rename = "typing_indicator")]
    Tippen { sender_id: UserId, is_typing: bool },

    #[serde(rename = "forced_logout")]
    ErzwungeneAbmeldung { message: String },
    #[serde(rename = "online_notification")]
    OnlineHinweis(OnlineHinweis),
    #[serde(rename = "offline_notification")]
    OfflineHinweis(OfflineHinweis),
    #[serde(rename = "offline_messages")]
    OfflineNachrichten(Vec<NachrichtDaten>),

    // Anruf-Signale (weitergereicht)
    #[serde(rename = "offer")]
    Offer(Map<String, Value>),
    #[serde(rename = "answer")]
    Answer(Map<String, Value>),
    #[serde(rename = "ice-candidate")]
    IceCandidate(Map<String, Value>),
    #[serde(rename = "call-request")]
    CallRequest(Map<String, Value>),
    #[serde(rename = "call-accepted")]
    CallAccepted(Map<String, Value>),
    #[serde(rename = "call-rejected")]
    CallRejected(Map<String, Value>),
    #[serde(rename = "call-ended")]
    CallEnded(Map<String, Value>),
    #[serde(rename = "call-failed")]
    AnrufFehlgeschlagen { reason: String },

    #[serde(rename = "error")]
    Fehler(Fehlermeldung),
}

impl Ausgehend {
    /// Erstellt eine Pong-Antwort mit aktuellem Zeitstempel
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn nachricht_gesendet(message_id: MessageId) -> Self {
        Self::NachrichtGesendet(Gesendet {
            message_id,
            status: STATUS_GESENDET,
        })
    }

    pub fn gruppe_gesendet(message_id: MessageId, group_id: GroupId) -> Self {
        Self::GruppenNachrichtGesendet(GruppenGesendet {
            message_id,
            group_id,
            status: STATUS_GESENDET,
        })
    }

    /// Hinweis an eine Session die von einem neuen Login verdraengt wird
    pub fn erzwungene_abmeldung() -> Self {
        Self::ErzwungeneAbmeldung {
            message: "Ihr Konto wurde auf einem anderen Geraet angemeldet".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ausgehend_nutzt_type_und_data() {
        let wert = serde_json::to_value(Ausgehend::nachricht_gesendet(MessageId(5))).unwrap();
        assert_eq!(
            wert,
            json!({"type": "message_sent", "data": {"message_id": 5, "status": "sent"}})
        );
    }

    #[test]
    fn fehlermeldung_ohne_text_laesst_feld_weg() {
        let fehler = Ausgehend::GruppenNachrichtFehler(Fehlermeldung {
            error: "group_disbanded",
            message: None,
        });
        let wert = serde_json::to_value(fehler).unwrap();
        assert_eq!(wert, json!({"type": "group_message_error", "data": {"error": "group_disbanded"}}));
    }

    #[test]
    fn online_hinweis_ist_flach() {
        let hinweis = Ausgehend::OnlineHinweis(OnlineHinweis {
            benutzer: BenutzerKurzinfo {
                user_id: UserId(3),
                username: "anna".into(),
                full_name: Some("Anna Berg".into()),
                avatar: None,
            },
            online_time: 1_700_000_000,
        });
        let wert = serde_json::to_value(hinweis).unwrap();
        assert_eq!(wert["type"], "online_notification");
        assert_eq!(wert["data"]["user_id"], 3);
        assert_eq!(wert["data"]["username"], "anna");
        assert_eq!(wert["data"]["online_time"], 1_700_000_000);
    }

    #[test]
    fn anruf_signal_bekommt_absender() {
        let mut daten = Map::new();
        daten.insert("targetUserId".into(), json!(9));
        daten.insert("sdp".into(), json!("v=0"));
        let signal = AnrufSignal {
            art: AnrufArt::Offer,
            ziel: UserId(9),
            daten,
        };
        let wert = serde_json::to_value(signal.weiterleiten(UserId(4))).unwrap();
        assert_eq!(wert["type"], "offer");
        assert_eq!(wert["data"]["fromUserId"], 4);
        assert_eq!(wert["data"]["sdp"], "v=0");
    }

    #[test]
    fn anruf_art_namen_sind_umkehrbar() {
        for art in [
            AnrufArt::Offer,
            AnrufArt::IceCandidate,
            AnrufArt::CallRequest,
            AnrufArt::CallEnded,
        ] {
            assert_eq!(AnrufArt::aus_str(art.als_str()), Some(art));
        }
        assert_eq!(AnrufArt::aus_str("call-failed"), None);
    }
}
