//! Handler fuer alle eingehenden Umschlaege
//!
//! Jeder Handler ist fuer eine Nachrichtenart zustaendig und hat Zugriff
//! auf den gemeinsamen SignalingState. Antworten an den Absender laufen
//! ueber die Registry wie jede andere Zustellung.

pub mod anruf_handler;
pub mod gruppen_handler;
pub mod lese_handler;
pub mod nachricht_handler;
pub mod status_handler;

use plauder_core::UserId;
use plauder_protocol::Ausgehend;

use crate::server_state::SignalingState;

/// Sendet eine Antwort an den Absender
pub(crate) async fn antworten(state: &SignalingState, user_id: UserId, umschlag: Ausgehend) {
    if !state.registry.umschlag_senden(user_id, &umschlag).await {
        tracing::debug!(user_id = %user_id, "Antwort nicht zustellbar, Absender offline");
    }
}
