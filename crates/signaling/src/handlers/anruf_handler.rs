//! Anruf-Signale (WebRTC) weiterreichen
//!
//! Die Nutzlast wird nicht interpretiert und nicht gespeichert. Der
//! Empfaenger bekommt sie mit `fromUserId` ergaenzt. Ist das Ziel einer
//! `call-request` offline, erhaelt der Anrufer `call-failed`.

use plauder_core::UserId;
use plauder_protocol::{AnrufArt, AnrufSignal, Ausgehend};

use super::antworten;
use crate::server_state::SignalingState;

/// Grund fuer `call-failed` wenn das Ziel nicht verbunden ist
pub const GRUND_OFFLINE: &str = "Benutzer ist offline";

pub async fn handle_anruf(signal: AnrufSignal, sender: UserId, state: &SignalingState) {
    let art = signal.art;
    let ziel = signal.ziel;

    if state.registry.umschlag_senden(ziel, &signal.weiterleiten(sender)).await {
        tracing::debug!(art = art.als_str(), von = %sender, ziel = %ziel, "Anruf-Signal weitergeleitet");
        return;
    }

    tracing::debug!(art = art.als_str(), von = %sender, ziel = %ziel, "Anruf-Ziel offline");
    if art == AnrufArt::CallRequest {
        antworten(
            state,
            sender,
            Ausgehend::AnrufFehlgeschlagen {
                reason: GRUND_OFFLINE.to_string(),
            },
        )
        .await;
    }
}
