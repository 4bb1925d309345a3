//! Private Nachrichten – pruefen, speichern, zustellen
//!
//! Ablauf: Beziehung pruefen -> speichern (Anruf-Ende dedupliziert) ->
//! an den Empfaenger zustellen -> `message_sent` an den Absender.
//! Ist der Empfaenger offline, bekommt er die Nachricht beim naechsten
//! Verbindungsaufbau mit `offline_messages`.

use plauder_core::UserId;
use plauder_db::{bewerten, models::NeueNachricht};
use plauder_protocol::control::NachrichtSenden;
use plauder_protocol::{Ausgehend, Fehlermeldung};

use super::antworten;
use crate::dedup::Gespeichert;
use crate::server_state::SignalingState;
use crate::umwandlung::nachricht_daten;

pub async fn handle_nachricht(anfrage: NachrichtSenden, sender: UserId, state: &SignalingState) {
    let empfaenger = anfrage.receiver_id;

    let beziehungen = match state.db.beziehungen_zwischen(sender, empfaenger).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(
                sender = %sender,
                empfaenger = %empfaenger,
                fehler = %e,
                "Beziehung nicht lesbar, Nachricht verworfen"
            );
            return;
        }
    };
    if let Err(ablehnung) = bewerten(sender, empfaenger, &beziehungen) {
        tracing::debug!(sender = %sender, empfaenger = %empfaenger, grund = %ablehnung, "Nachricht abgelehnt");
        antworten(
            state,
            sender,
            Ausgehend::NachrichtFehler(Fehlermeldung::neu(ablehnung.code(), ablehnung.meldung())),
        )
        .await;
        return;
    }

    let daten = NeueNachricht {
        sender_id: sender,
        receiver_id: empfaenger,
        content: &anfrage.content,
        message_type: anfrage.message_type,
        file_name: anfrage.file_name.as_deref(),
        quoted_message_id: anfrage.quoted_message_id,
        quoted_message_content: anfrage.quoted_message_content.as_deref(),
        call_type: anfrage.call_type.as_deref(),
        voice_duration: anfrage.voice_duration,
    };

    let gespeichert = match state.dedup.speichern(&*state.db, daten).await {
        Ok(g) => g,
        Err(e) => {
            tracing::error!(sender = %sender, empfaenger = %empfaenger, fehler = %e, "Nachricht nicht gespeichert");
            return;
        }
    };

    let message_id = gespeichert.message_id();
    if let Gespeichert::Neu(record) = gespeichert {
        let zugestellt = state
            .registry
            .umschlag_senden(empfaenger, &Ausgehend::Nachricht(nachricht_daten(&record)))
            .await;
        tracing::debug!(
            message_id = %message_id,
            empfaenger = %empfaenger,
            zugestellt,
            "Private Nachricht gespeichert"
        );
    }

    antworten(state, sender, Ausgehend::nachricht_gesendet(message_id)).await;
}
