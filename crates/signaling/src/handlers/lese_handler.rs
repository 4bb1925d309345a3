//! Lesebestaetigungen
//!
//! Drei Formen: einzelne private Nachricht, alle ungelesenen eines
//! Absenders, einzelne Gruppennachricht. Nur wenn sich der Lesestatus
//! tatsaechlich geaendert hat, bekommt der urspruengliche Absender einen
//! Hinweis. Der Hinweis laeuft ueber den Aufgaben-Pool.

use plauder_core::UserId;
use plauder_protocol::control::{GruppenLeseInfo, LeseInfo};
use plauder_protocol::{Ausgehend, Lesebestaetigung};

use crate::server_state::SignalingState;

pub async fn handle_lesebestaetigung(
    anfrage: Lesebestaetigung,
    leser: UserId,
    state: &SignalingState,
) {
    let hinweis = match anfrage {
        Lesebestaetigung::Einzeln(id) => match state.db.als_gelesen_markieren(id, leser).await {
            Ok(Some(record)) => Some((
                record.sender_id,
                Ausgehend::Lesebestaetigung(LeseInfo {
                    message_id: Some(record.id),
                    receiver_id: leser,
                }),
            )),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(message_id = %id, leser = %leser, fehler = %e, "Lesestatus nicht gespeichert");
                None
            }
        },
        Lesebestaetigung::AlleVon(sender) => {
            match state.db.alle_von_sender_gelesen(leser, sender).await {
                Ok(0) => None,
                Ok(anzahl) => {
                    tracing::debug!(leser = %leser, sender = %sender, anzahl, "Nachrichten als gelesen markiert");
                    Some((
                        sender,
                        Ausgehend::Lesebestaetigung(LeseInfo {
                            message_id: None,
                            receiver_id: leser,
                        }),
                    ))
                }
                Err(e) => {
                    tracing::error!(leser = %leser, sender = %sender, fehler = %e, "Lesestatus nicht gespeichert");
                    None
                }
            }
        }
        Lesebestaetigung::Gruppe(id) => match state.db.gruppen_nachricht_gelesen(id, leser).await {
            Ok(Some(record)) => Some((
                record.sender_id,
                Ausgehend::GruppenLesebestaetigung(GruppenLeseInfo {
                    message_id: record.id,
                    group_id: record.group_id,
                    reader_id: leser,
                }),
            )),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(message_id = %id, leser = %leser, fehler = %e, "Gruppen-Lesestatus nicht gespeichert");
                None
            }
        },
    };

    let Some((empfaenger, umschlag)) = hinweis else {
        return;
    };

    let registry = state.registry.clone();
    state.aufgaben.einreichen("lesebestaetigung", async move {
        if !registry.umschlag_senden(empfaenger, &umschlag).await {
            tracing::debug!(empfaenger = %empfaenger, "Absender offline, Lesebestaetigung entfaellt");
        }
    });
}
