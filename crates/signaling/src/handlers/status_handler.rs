//! Statuswechsel und Tipp-Anzeige

use plauder_core::{BenutzerStatus, UserId};
use plauder_protocol::control::{StatusAendern, TippAnzeige};
use plauder_protocol::{Ausgehend, Fehlermeldung};

use super::antworten;
use crate::server_state::SignalingState;
use crate::umwandlung::status_info;

/// Setzt den Status, benachrichtigt die Kontakte und bestaetigt dem Absender
pub async fn handle_status_aendern(anfrage: StatusAendern, sender: UserId, state: &SignalingState) {
    let status: BenutzerStatus = match anfrage.status.parse() {
        Ok(s) => s,
        Err(_) => {
            tracing::debug!(sender = %sender, status = %anfrage.status, "Ungueltiger Status");
            antworten(
                state,
                sender,
                Ausgehend::StatusAenderungFehler(Fehlermeldung::neu(
                    "invalid_status",
                    format!("Unbekannter Status: {}", anfrage.status),
                )),
            )
            .await;
            return;
        }
    };

    if let Err(e) = state.db.status_setzen(sender, status).await {
        tracing::error!(sender = %sender, fehler = %e, "Status nicht gespeichert");
        antworten(
            state,
            sender,
            Ausgehend::StatusAenderungFehler(Fehlermeldung::neu(
                "update_failed",
                "Status konnte nicht gespeichert werden",
            )),
        )
        .await;
        return;
    }

    match state.db.profil(sender).await {
        Ok(Some(profil)) => {
            let erreicht = state
                .presenz
                .an_kontakte(sender, &Ausgehend::StatusAenderung(status_info(&profil)))
                .await;
            tracing::debug!(sender = %sender, status = status.als_str(), erreicht, "Statuswechsel verteilt");
        }
        Ok(None) => tracing::warn!(sender = %sender, "Profil fuer Statuswechsel fehlt"),
        Err(e) => tracing::error!(sender = %sender, fehler = %e, "Profil nicht lesbar"),
    }

    antworten(state, sender, Ausgehend::StatusAenderungErfolg { status }).await;
}

/// Reicht die Tipp-Anzeige an den Empfaenger weiter, ohne Speicherung
pub async fn handle_tippen(anfrage: TippAnzeige, sender: UserId, state: &SignalingState) {
    let umschlag = Ausgehend::Tippen {
        sender_id: sender,
        is_typing: anfrage.is_typing,
    };
    if !state.registry.umschlag_senden(anfrage.receiver_id, &umschlag).await {
        tracing::trace!(empfaenger = %anfrage.receiver_id, "Tipp-Anzeige verworfen, Empfaenger offline");
    }
}
