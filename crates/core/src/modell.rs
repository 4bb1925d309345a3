//! Fachliche Aufzaehlungen die von Protokoll, Datenbank und Router geteilt werden
//!
//! Alle Typen werden in der Datenbank und auf dem Draht als Kleinbuchstaben-
//! String abgelegt (`als_str` / `FromStr`).

use serde::{Deserialize, Serialize};

use crate::error::PlauderError;

// ---------------------------------------------------------------------------
// Nachrichtentyp
// ---------------------------------------------------------------------------

/// Art einer Chat-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NachrichtenTyp {
    Text,
    Image,
    Video,
    File,
    Audio,
    CallInitiated,
    CallRejected,
    CallEnded,
    CallEndedVideo,
}

impl NachrichtenTyp {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::File => "file",
            Self::Audio => "audio",
            Self::CallInitiated => "call_initiated",
            Self::CallRejected => "call_rejected",
            Self::CallEnded => "call_ended",
            Self::CallEndedVideo => "call_ended_video",
        }
    }

    /// Anruf-Ende-Nachrichten werden von beiden Teilnehmern gleichzeitig
    /// gemeldet und muessen dedupliziert werden
    pub fn ist_anruf_ende(&self) -> bool {
        matches!(self, Self::CallEnded | Self::CallEndedVideo)
    }
}

impl Default for NachrichtenTyp {
    fn default() -> Self {
        Self::Text
    }
}

impl std::str::FromStr for NachrichtenTyp {
    type Err = PlauderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "file" => Ok(Self::File),
            "audio" => Ok(Self::Audio),
            "call_initiated" => Ok(Self::CallInitiated),
            "call_rejected" => Ok(Self::CallRejected),
            "call_ended" => Ok(Self::CallEnded),
            "call_ended_video" => Ok(Self::CallEndedVideo),
            other => Err(PlauderError::unbekannt("Nachrichtentyp", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Nachrichtenstatus
// ---------------------------------------------------------------------------

/// Status einer gespeicherten Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NachrichtenStatus {
    Normal,
    Recalled,
}

impl NachrichtenStatus {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Recalled => "recalled",
        }
    }
}

impl std::str::FromStr for NachrichtenStatus {
    type Err = PlauderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "recalled" => Ok(Self::Recalled),
            other => Err(PlauderError::unbekannt("Nachrichtenstatus", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Benutzerstatus
// ---------------------------------------------------------------------------

/// Sichtbarer Online-Status eines Benutzers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenutzerStatus {
    Online,
    Busy,
    Away,
    Offline,
}

impl BenutzerStatus {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Busy => "busy",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

impl std::str::FromStr for BenutzerStatus {
    type Err = PlauderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "busy" => Ok(Self::Busy),
            "away" => Ok(Self::Away),
            "offline" => Ok(Self::Offline),
            other => Err(PlauderError::unbekannt("Benutzerstatus", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Kontakt-Freigabe
// ---------------------------------------------------------------------------

/// Freigabestatus einer Kontaktbeziehung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freigabe {
    Pending,
    Approved,
    Rejected,
}

impl Freigabe {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for Freigabe {
    type Err = PlauderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(PlauderError::unbekannt("Freigabestatus", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Gruppenrolle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GruppenRolle {
    Owner,
    Admin,
    Member,
}

impl GruppenRolle {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl std::str::FromStr for GruppenRolle {
    type Err = PlauderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(PlauderError::unbekannt("Gruppenrolle", other)),
        }
    }
}
