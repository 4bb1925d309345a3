//! Message-Dispatcher – Routet eingehende Umschlaege an die Handler
//!
//! Der Dispatcher ist zustandslos: Art lesen, passenden Handler aufrufen.
//! Ungueltige oder unbekannte Umschlaege bekommen einen `error`-Umschlag,
//! die Verbindung bleibt offen.

use async_trait::async_trait;
use bytes::Bytes;
use plauder_protocol::{dekodieren, Ausgehend, Eingehend, Fehlermeldung, ProtokollFehler};
use std::sync::Arc;
use std::time::Instant;

use crate::connection::UmschlagVerarbeiter;
use crate::handlers::{
    anruf_handler, antworten, gruppen_handler, lese_handler, nachricht_handler, status_handler,
};
use crate::server_state::SignalingState;
use crate::session::Session;

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Fuehrt den Handler fuer einen dekodierten Umschlag aus
    pub async fn dispatch(&self, session: &Arc<Session>, nachricht: Eingehend) {
        let sender = session.user_id();
        let state = &*self.state;

        match nachricht {
            Eingehend::Nachricht(anfrage) => {
                nachricht_handler::handle_nachricht(anfrage, sender, state).await
            }
            Eingehend::GruppenNachricht(anfrage) => {
                gruppen_handler::handle_gruppen_nachricht(anfrage, sender, state).await
            }
            Eingehend::Lesebestaetigung(anfrage) => {
                lese_handler::handle_lesebestaetigung(anfrage, sender, state).await
            }

            // Heartbeat: Zaehler zuruecksetzen, sonst nichts
            Eingehend::Ping => {
                session.heartbeat_zuruecksetzen();
                antworten(state, sender, Ausgehend::pong()).await;
            }

            Eingehend::StatusAendern(anfrage) => {
                status_handler::handle_status_aendern(anfrage, sender, state).await
            }
            Eingehend::Tippen(anfrage) => status_handler::handle_tippen(anfrage, sender, state).await,
            Eingehend::Anruf(signal) => anruf_handler::handle_anruf(signal, sender, state).await,
        }
    }
}

#[async_trait]
impl UmschlagVerarbeiter for MessageDispatcher {
    async fn verarbeiten(&self, session: &Arc<Session>, roh: Bytes) {
        let nachricht = match dekodieren(&roh) {
            Ok(n) => n,
            Err(e) => {
                let code = match e {
                    ProtokollFehler::UnbekannterTyp(_) => "unknown_type",
                    _ => "invalid_message",
                };
                tracing::debug!(user_id = %session.user_id(), fehler = %e, "Umschlag verworfen");
                self.state.metriken.umschlaege_total.with_label_values(&[code]).inc();
                antworten(
                    &self.state,
                    session.user_id(),
                    Ausgehend::Fehler(Fehlermeldung::neu(code, e.to_string())),
                )
                .await;
                return;
            }
        };

        let art = nachricht.art();
        self.state.metriken.umschlaege_total.with_label_values(&[art]).inc();
        tracing::trace!(user_id = %session.user_id(), art, "Umschlag empfangen");

        let start = Instant::now();
        self.dispatch(session, nachricht).await;
        self.state
            .metriken
            .verarbeitung_seconds
            .with_label_values(&[art])
            .observe(start.elapsed().as_secs_f64());
    }
}
