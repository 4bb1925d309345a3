//! Wire-Format fuer WebSocket-Verbindungen
//!
//! Transportneutrale Frames und die JSON-Kodierung der Umschlaege.
//!
//! ## Umschlag-Format
//!
//! ```text
//! {"type": "<art>", "data": { ... }}
//! ```
//!
//! `data` darf fuer Nachrichten ohne Nutzlast (`ping`) fehlen.
//! Maximale Frame-Groesse ist konfigurierbar (Standard: 512 KiB).

use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::control::{
    AnrufArt, AnrufSignal, Ausgehend, Eingehend, Lesebestaetigung, LesebestaetigungRoh,
};
use plauder_core::UserId;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (512 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024;

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehler beim Lesen oder Schreiben eines Umschlags
#[derive(Debug, Error)]
pub enum ProtokollFehler {
    #[error("Ungueltiges JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unbekannter Nachrichtentyp: {0}")]
    UnbekannterTyp(String),

    #[error("Ungueltige Daten fuer '{art}': {grund}")]
    UngueltigeDaten { art: String, grund: String },
}

impl ProtokollFehler {
    fn daten(art: &str, grund: impl Into<String>) -> Self {
        Self::UngueltigeDaten {
            art: art.to_string(),
            grund: grund.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Ein einzelner Transport-Frame
///
/// Entkoppelt den Verbindungsadapter vom konkreten WebSocket-Crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(Bytes),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    Close,
}

impl Frame {
    /// Laenge der Nutzlast in Bytes
    pub fn laenge(&self) -> usize {
        match self {
            Self::Text(b) | Self::Binary(b) | Self::Ping(b) | Self::Pong(b) => b.len(),
            Self::Close => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Kodierung
// ---------------------------------------------------------------------------

/// Serialisiert einen ausgehenden Umschlag
pub fn kodieren(nachricht: &Ausgehend) -> Result<Bytes, ProtokollFehler> {
    Ok(Bytes::from(serde_json::to_vec(nachricht)?))
}

#[derive(Deserialize)]
struct UmschlagRoh {
    #[serde(rename = "type")]
    art: String,
    #[serde(default)]
    data: Value,
}

/// Liest einen eingehenden Umschlag
pub fn dekodieren(roh: &[u8]) -> Result<Eingehend, ProtokollFehler> {
    let umschlag: UmschlagRoh = serde_json::from_slice(roh)?;
    let art = umschlag.art.as_str();
    let data = umschlag.data;

    let nachricht = match art {
        "message" => Eingehend::Nachricht(nutzlast(art, data)?),
        "group_message_send" => Eingehend::GruppenNachricht(nutzlast(art, data)?),
        "read_receipt" => Eingehend::Lesebestaetigung(lesebestaetigung(art, data)?),
        "ping" => Eingehend::Ping,
        "status_change" => Eingehend::StatusAendern(nutzlast(art, data)?),
        "typing_indicator" => Eingehend::Tippen(nutzlast(art, data)?),
        andere => match AnrufArt::aus_str(andere) {
            Some(anruf) => Eingehend::Anruf(anruf_signal(anruf, data)?),
            None => return Err(ProtokollFehler::UnbekannterTyp(andere.to_string())),
        },
    };
    Ok(nachricht)
}

fn nutzlast<T: serde::de::DeserializeOwned>(art: &str, data: Value) -> Result<T, ProtokollFehler> {
    serde_json::from_value(data).map_err(|e| ProtokollFehler::daten(art, e.to_string()))
}

fn lesebestaetigung(art: &str, data: Value) -> Result<Lesebestaetigung, ProtokollFehler> {
    let roh: LesebestaetigungRoh = nutzlast(art, data)?;
    match (roh.message_id, roh.sender_id, roh.group_message_id) {
        (Some(id), _, _) => Ok(Lesebestaetigung::Einzeln(id)),
        (None, Some(sender), _) => Ok(Lesebestaetigung::AlleVon(sender)),
        (None, None, Some(id)) => Ok(Lesebestaetigung::Gruppe(id)),
        (None, None, None) => Err(ProtokollFehler::daten(
            art,
            "message_id, sender_id oder group_message_id fehlt",
        )),
    }
}

fn anruf_signal(art: AnrufArt, data: Value) -> Result<AnrufSignal, ProtokollFehler> {
    let daten = match data {
        Value::Object(map) => map,
        _ => return Err(ProtokollFehler::daten(art.als_str(), "Objekt erwartet")),
    };
    let ziel = daten
        .get("targetUserId")
        .and_then(Value::as_i64)
        .ok_or_else(|| ProtokollFehler::daten(art.als_str(), "targetUserId fehlt"))?;
    Ok(AnrufSignal {
        art,
        ziel: UserId(ziel),
        daten,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plauder_core::{MessageId, NachrichtenTyp};

    #[test]
    fn private_nachricht_dekodieren() {
        let roh = br#"{"type":"message","data":{"receiver_id":2,"content":"hallo","message_type":"text"}}"#;
        match dekodieren(roh).unwrap() {
            Eingehend::Nachricht(n) => {
                assert_eq!(n.receiver_id, UserId(2));
                assert_eq!(n.content, "hallo");
                assert_eq!(n.message_type, NachrichtenTyp::Text);
                assert!(n.file_name.is_none());
            }
            andere => panic!("Falsche Art: {andere:?}"),
        }
    }

    #[test]
    fn nachrichtentyp_fehlt_ist_text() {
        let roh = br#"{"type":"message","data":{"receiver_id":2,"content":"x"}}"#;
        let Eingehend::Nachricht(n) = dekodieren(roh).unwrap() else {
            panic!("Nachricht erwartet");
        };
        assert_eq!(n.message_type, NachrichtenTyp::Text);
    }

    #[test]
    fn ping_ohne_daten() {
        assert!(matches!(dekodieren(br#"{"type":"ping"}"#).unwrap(), Eingehend::Ping));
        assert!(matches!(
            dekodieren(br#"{"type":"ping","data":{}}"#).unwrap(),
            Eingehend::Ping
        ));
    }

    #[test]
    fn lesebestaetigung_varianten() {
        let einzeln = dekodieren(br#"{"type":"read_receipt","data":{"message_id":11}}"#).unwrap();
        assert!(matches!(
            einzeln,
            Eingehend::Lesebestaetigung(Lesebestaetigung::Einzeln(MessageId(11)))
        ));

        let alle = dekodieren(br#"{"type":"read_receipt","data":{"sender_id":4}}"#).unwrap();
        assert!(matches!(
            alle,
            Eingehend::Lesebestaetigung(Lesebestaetigung::AlleVon(UserId(4)))
        ));

        let leer = dekodieren(br#"{"type":"read_receipt","data":{}}"#);
        assert!(matches!(leer, Err(ProtokollFehler::UngueltigeDaten { .. })));
    }

    #[test]
    fn anruf_signal_braucht_ziel() {
        let ok = dekodieren(br#"{"type":"ice-candidate","data":{"targetUserId":8,"candidate":"c"}}"#)
            .unwrap();
        let Eingehend::Anruf(signal) = ok else {
            panic!("Anruf-Signal erwartet");
        };
        assert_eq!(signal.art, AnrufArt::IceCandidate);
        assert_eq!(signal.ziel, UserId(8));
        assert_eq!(signal.daten["candidate"], "c");

        let ohne_ziel = dekodieren(br#"{"type":"offer","data":{"sdp":"v=0"}}"#);
        assert!(matches!(ohne_ziel, Err(ProtokollFehler::UngueltigeDaten { .. })));
    }

    #[test]
    fn unbekannter_typ_wird_abgelehnt() {
        let e = dekodieren(br#"{"type":"sticker","data":{}}"#).unwrap_err();
        assert!(matches!(e, ProtokollFehler::UnbekannterTyp(ref t) if t == "sticker"));
    }

    #[test]
    fn kaputtes_json_ist_fehler() {
        assert!(matches!(dekodieren(b"{nicht json"), Err(ProtokollFehler::Json(_))));
    }

    #[test]
    fn kodieren_liefert_json() {
        let bytes = kodieren(&Ausgehend::pong()).unwrap();
        let wert: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(wert["type"], "pong");
        assert!(wert["data"]["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn frame_laenge() {
        assert_eq!(Frame::Text(Bytes::from_static(b"abc")).laenge(), 3);
        assert_eq!(Frame::Close.laenge(), 0);
    }
}
