//! WebSocket-Endpunkt
//!
//! Prueft das Token vor dem Upgrade (Query-Parameter `token` oder
//! `Authorization`-Header), legt die Session an, registriert sie und
//! uebergibt den Socket an den Verbindungsadapter.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use futures_util::{future, SinkExt, StreamExt};
use plauder_core::UserId;
use plauder_protocol::Frame;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::connection::{verbindung_betreiben, UmschlagVerarbeiter};
use crate::dispatcher::MessageDispatcher;
use crate::server_state::SignalingState;
use crate::session::Session;

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Erstellt den Router mit dem WebSocket-Endpunkt
pub fn ws_router(state: Arc<SignalingState>) -> Router {
    let pfad = state.config.ws_pfad.clone();
    Router::new().route(&pfad, get(ws_upgrade)).with_state(state)
}

async fn ws_upgrade(
    State(state): State<Arc<SignalingState>>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = query.token.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let user_id = match token {
        Some(t) => match state.pruefer.pruefen(&t).await {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(fehler = %e, "WebSocket-Upgrade abgelehnt");
                return nicht_autorisiert(&e.to_string());
            }
        },
        None => return nicht_autorisiert("Kein Token angegeben"),
    };

    let upgrade = match upgrade {
        Ok(u) => u,
        Err(rejection) => return rejection.into_response(),
    };

    let max = state.config.verbindung.max_frame_bytes;
    upgrade
        .max_frame_size(max)
        .max_message_size(max)
        .on_upgrade(move |socket| socket_betreiben(socket, user_id, state))
}

fn nicht_autorisiert(meldung: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized", "message": meldung })),
    )
        .into_response()
}

/// Betreibt einen authentifizierten Socket bis zum Verbindungsende
pub async fn socket_betreiben(socket: WebSocket, user_id: UserId, state: Arc<SignalingState>) {
    let (session, queue) = Session::neu(user_id, state.config.verbindung.queue_groesse);

    if let Err(e) = state.session_eroeffnen(&session).await {
        tracing::error!(user_id = %user_id, fehler = %e, "Session nicht registriert");
        return;
    }
    tracing::info!(user_id = %user_id, session = %session.id(), "WebSocket verbunden");

    let (ausgang, eingang) = socket.split();
    let eingang = eingang.map(|r| r.map(nachricht_zu_frame));
    let ausgang = ausgang.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(frame_zu_nachricht(frame))));

    let verarbeiter: Arc<dyn UmschlagVerarbeiter> =
        Arc::new(MessageDispatcher::neu(Arc::clone(&state)));

    verbindung_betreiben(
        eingang,
        ausgang,
        session,
        queue,
        state.registry.clone(),
        verarbeiter,
        state.config.verbindung.clone(),
        state.shutdown.clone(),
    )
    .await;
}

pub(crate) fn nachricht_zu_frame(nachricht: Message) -> Frame {
    match nachricht {
        Message::Text(text) => Frame::Text(Bytes::from(text)),
        Message::Binary(daten) => Frame::Binary(Bytes::from(daten)),
        Message::Ping(daten) => Frame::Ping(Bytes::from(daten)),
        Message::Pong(daten) => Frame::Pong(Bytes::from(daten)),
        Message::Close(_) => Frame::Close,
    }
}

pub(crate) fn frame_zu_nachricht(frame: Frame) -> Message {
    match frame {
        Frame::Text(daten) => Message::Text(String::from_utf8_lossy(&daten).into_owned()),
        Frame::Binary(daten) => Message::Binary(daten.to_vec()),
        Frame::Ping(daten) => Message::Ping(daten.to_vec()),
        Frame::Pong(daten) => Message::Pong(daten.to_vec()),
        Frame::Close => Message::Close(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use plauder_auth::{SessionStore, TokenPruefer};
    use plauder_db::{Datenbank, SqliteDb};
    use plauder_observability::PlauderMetrics;
    use tower::ServiceExt;

    use crate::server_state::SignalingConfig;

    async fn state() -> (Arc<SignalingState>, Arc<SessionStore>) {
        let db: Arc<dyn Datenbank> = Arc::new(SqliteDb::in_memory().await.unwrap());
        let store = SessionStore::neu();
        let pruefer: Arc<dyn TokenPruefer> = store.clone();
        let metriken = Arc::new(PlauderMetrics::neu().unwrap());
        let state = SignalingState::starten(SignalingConfig::default(), db, pruefer, metriken);
        (state, store)
    }

    #[test]
    fn text_frames_bleiben_text() {
        let frame = nachricht_zu_frame(Message::Text("{\"type\":\"ping\"}".into()));
        assert_eq!(frame, Frame::Text(Bytes::from_static(b"{\"type\":\"ping\"}")));

        let zurueck = frame_zu_nachricht(frame);
        assert!(matches!(zurueck, Message::Text(t) if t == "{\"type\":\"ping\"}"));
        assert!(matches!(frame_zu_nachricht(Frame::Close), Message::Close(None)));
        assert_eq!(nachricht_zu_frame(Message::Close(None)), Frame::Close);
    }

    #[tokio::test]
    async fn ohne_token_401() {
        let (state, _) = state().await;
        let antwort = ws_router(Arc::clone(&state))
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::UNAUTHORIZED);
        state.herunterfahren().await;
    }

    #[tokio::test]
    async fn falsches_token_401() {
        let (state, _) = state().await;
        let antwort = ws_router(Arc::clone(&state))
            .oneshot(
                Request::builder()
                    .uri("/ws?token=falsch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::UNAUTHORIZED);
        state.herunterfahren().await;
    }

    #[tokio::test]
    async fn gueltiges_token_ohne_upgrade_ist_kein_401() {
        let (state, store) = state().await;
        let session = store.erstellen(UserId(1)).await.unwrap();
        let antwort = ws_router(Arc::clone(&state))
            .oneshot(
                Request::builder()
                    .uri("/ws")
                    .header(header::AUTHORIZATION, format!("Bearer {}", session.token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_ne!(antwort.status(), StatusCode::UNAUTHORIZED);
        assert!(antwort.status().is_client_error());
        state.herunterfahren().await;
    }
}
