//! End-to-End-Tests mit echtem WebSocket-Client

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use plauder_auth::SessionStore;
use plauder_core::UserId;
use plauder_db::{models::NeuerBenutzer, SqliteDb};
use plauder_server::{config::ServerConfig, GebundenerServer, Server};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{http, Error as WsError, Message};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    url: String,
    server: Option<GebundenerServer>,
    stopp: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<anyhow::Result<()>>>,
    db: SqliteDb,
    tokens: Arc<SessionStore>,
}

impl TestServer {
    async fn starten() -> Self {
        let mut config = ServerConfig::default();
        config.netzwerk.bind_adresse = "127.0.0.1".into();
        config.netzwerk.ws_port = 0;
        config.observability.aktiviert = false;

        let db = SqliteDb::in_memory().await.unwrap();
        let server = Server::neu(config).binden_mit(db.clone()).await.unwrap();
        let url = format!("ws://{}/ws", server.adresse());
        let tokens = Arc::clone(server.tokens());
        Self {
            url,
            tokens,
            server: Some(server),
            stopp: None,
            task: None,
            db,
        }
    }

    fn laufen(&mut self) {
        let server = self.server.take().expect("Server laeuft bereits");
        let (tx, rx) = oneshot::channel::<()>();
        self.stopp = Some(tx);
        self.task = Some(tokio::spawn(server.betreiben(async move {
            let _ = rx.await;
        })));
    }

    async fn benutzer(&self, name: &str) -> UserId {
        self.db
            .benutzer_anlegen(NeuerBenutzer {
                username: name,
                full_name: None,
                avatar: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn token(&self, user: UserId) -> String {
        self.tokens
            .erstellen(user)
            .await
            .unwrap()
            .token
    }

    async fn beenden(mut self) {
        if let Some(tx) = self.stopp.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            timeout(TIMEOUT, task)
                .await
                .expect("Server beendet sich nicht")
                .unwrap()
                .unwrap();
        }
    }
}

async fn verbinden(url: &str, token: &str) -> WsStream {
    let (ws, _) = connect_async(format!("{url}?token={token}")).await.unwrap();
    ws
}

async fn senden(ws: &mut WsStream, umschlag: Value) {
    ws.send(Message::text(umschlag.to_string())).await.unwrap();
}

/// Liest Text-Frames bis einer der Art `art` kommt
async fn erwarten(ws: &mut WsStream, art: &str) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("Timeout beim Warten auf Umschlag")
            .expect("Verbindung beendet")
            .unwrap();
        if let Message::Text(text) = msg {
            let wert: Value = serde_json::from_str(&text).unwrap();
            if wert["type"] == art {
                return wert;
            }
        }
    }
}

/// Wartet bis der Server die Verbindung schliesst
async fn geschlossen(ws: &mut WsStream) {
    loop {
        match timeout(TIMEOUT, ws.next()).await.expect("Verbindung bleibt offen") {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => continue,
        }
    }
}

#[tokio::test]
async fn ohne_gueltiges_token_kein_upgrade() {
    let mut server = TestServer::starten().await;
    server.laufen();

    for url in [server.url.clone(), format!("{}?token=falsch", server.url)] {
        match connect_async(url).await {
            Err(WsError::Http(antwort)) => assert_eq!(antwort.status(), 401),
            andere => panic!("401 erwartet, erhalten: {:?}", andere.map(|_| ())),
        }
    }

    server.beenden().await;
}

#[tokio::test]
async fn ping_und_nachricht_ueber_websocket() {
    let mut server = TestServer::starten().await;
    let anna = server.benutzer("anna").await;
    let ben = server.benutzer("ben").await;
    server.db.befreunden(anna, ben).await.unwrap();
    let token_anna = server.token(anna).await;
    let token_ben = server.token(ben).await;
    server.laufen();

    let mut a = verbinden(&server.url, &token_anna).await;

    // Token im Authorization-Header
    let mut anfrage = server.url.as_str().into_client_request().unwrap();
    anfrage.headers_mut().insert(
        http::header::AUTHORIZATION,
        format!("Bearer {token_ben}").parse().unwrap(),
    );
    let (mut b, _) = connect_async(anfrage).await.unwrap();

    // Anna sieht Ben online kommen
    let hinweis = erwarten(&mut a, "online_notification").await;
    assert_eq!(hinweis["data"]["user_id"], ben.inner());

    senden(&mut a, json!({"type": "ping"})).await;
    erwarten(&mut a, "pong").await;

    senden(
        &mut a,
        json!({"type": "message", "data": {"receiver_id": ben.inner(), "content": "Hallo"}}),
    )
    .await;
    let nachricht = erwarten(&mut b, "message").await;
    assert_eq!(nachricht["data"]["content"], "Hallo");
    let bestaetigung = erwarten(&mut a, "message_sent").await;
    assert_eq!(bestaetigung["data"]["message_id"], nachricht["data"]["id"]);

    server.beenden().await;
    geschlossen(&mut a).await;
    geschlossen(&mut b).await;
}

#[tokio::test]
async fn zweites_geraet_verdraengt_das_erste() {
    let mut server = TestServer::starten().await;
    let anna = server.benutzer("anna").await;
    let token = server.token(anna).await;
    server.laufen();

    let mut erstes = verbinden(&server.url, &token).await;
    senden(&mut erstes, json!({"type": "ping"})).await;
    erwarten(&mut erstes, "pong").await;

    let mut zweites = verbinden(&server.url, &token).await;

    let hinweis = erwarten(&mut erstes, "forced_logout").await;
    assert!(hinweis["data"]["message"].as_str().is_some());
    geschlossen(&mut erstes).await;

    // die neue Verbindung ist die aktive
    senden(&mut zweites, json!({"type": "ping"})).await;
    erwarten(&mut zweites, "pong").await;

    server.beenden().await;
}

#[tokio::test]
async fn offline_nachricht_beim_naechsten_verbinden() {
    let mut server = TestServer::starten().await;
    let anna = server.benutzer("anna").await;
    let ben = server.benutzer("ben").await;
    server.db.befreunden(anna, ben).await.unwrap();
    let token_anna = server.token(anna).await;
    let token_ben = server.token(ben).await;
    server.laufen();

    let mut a = verbinden(&server.url, &token_anna).await;
    senden(
        &mut a,
        json!({"type": "message", "data": {"receiver_id": ben.inner(), "content": "Spaeter lesen"}}),
    )
    .await;
    erwarten(&mut a, "message_sent").await;

    let mut b = verbinden(&server.url, &token_ben).await;
    let offline = erwarten(&mut b, "offline_messages").await;
    assert_eq!(offline["data"][0]["content"], "Spaeter lesen");

    server.beenden().await;
}
