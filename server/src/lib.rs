//! plauder-server – Bibliotheks-Root
//!
//! Verdrahtet Datenbank, Token-Pruefung, Signaling-Service und
//! Observability und stellt den Einstiegspunkt fuer Integrationstests
//! bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use plauder_auth::{SessionStore, TokenPruefer};
use plauder_db::{Datenbank, SqliteDb};
use plauder_observability::{observability_server_starten, HealthState, PlauderMetrics};
use plauder_signaling::{ws_router, SignalingState};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Intervall fuer die Bereinigung abgelaufener Tokens
const TOKEN_CLEANUP: Duration = Duration::from_secs(300);

/// Haelt den Server vor dem Start zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Oeffnet die Datenbank aus der Konfiguration und bindet den Listener
    pub async fn binden(self) -> Result<GebundenerServer> {
        tracing::info!(url = %self.config.datenbank.url, "Datenbankverbindung wird hergestellt");
        let db = SqliteDb::oeffnen(&self.config.datenbank_config())
            .await
            .context("Datenbank konnte nicht geoeffnet werden")?;
        self.binden_mit(db).await
    }

    /// Bindet den Listener mit einer bereits geoeffneten Datenbank
    pub async fn binden_mit(self, db: SqliteDb) -> Result<GebundenerServer> {
        let config = self.config;
        let metriken = Arc::new(PlauderMetrics::neu()?);
        let health = HealthState::neu().mit_sessions(metriken.sessions_online.clone());
        health.db_status_setzen(true);

        let tokens = SessionStore::mit_ttl(Duration::from_secs(config.server.token_ttl_sek));
        let token_cleanup = tokens.cleanup_starten(TOKEN_CLEANUP);

        let dyn_db: Arc<dyn Datenbank> = Arc::new(db.clone());
        let pruefer: Arc<dyn TokenPruefer> = tokens.clone();
        let state = SignalingState::starten(
            config.signaling_config(),
            dyn_db,
            pruefer,
            Arc::clone(&metriken),
        );

        let bind = config.ws_bind_adresse();
        let listener = TcpListener::bind(&bind)
            .await
            .with_context(|| format!("WebSocket-Port {bind} nicht verfuegbar"))?;
        let adresse = listener.local_addr()?;

        Ok(GebundenerServer {
            config,
            listener,
            adresse,
            db,
            tokens,
            token_cleanup,
            state,
            metriken,
            health,
        })
    }

    /// Startet alle Subsysteme und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        self.binden().await?.betreiben(ctrl_c()).await
    }
}

/// Server mit gebundenem Listener, bereit zum Betrieb
pub struct GebundenerServer {
    config: ServerConfig,
    listener: TcpListener,
    adresse: SocketAddr,
    db: SqliteDb,
    tokens: Arc<SessionStore>,
    token_cleanup: tokio::task::JoinHandle<()>,
    state: Arc<SignalingState>,
    metriken: Arc<PlauderMetrics>,
    health: HealthState,
}

impl GebundenerServer {
    /// Tatsaechliche Adresse des WebSocket-Listeners
    pub fn adresse(&self) -> SocketAddr {
        self.adresse
    }

    /// Token-Ausgabe fuer die umgebende Anwendung
    pub fn tokens(&self) -> &Arc<SessionStore> {
        &self.tokens
    }

    pub fn db(&self) -> &SqliteDb {
        &self.db
    }

    pub fn state(&self) -> &Arc<SignalingState> {
        &self.state
    }

    /// Nimmt Verbindungen an bis `shutdown` abgeschlossen ist
    ///
    /// Danach werden alle Sessions geschlossen und der Aufgaben-Pool
    /// geleert.
    pub async fn betreiben(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let Self {
            config,
            listener,
            adresse,
            db: _,
            tokens: _,
            token_cleanup,
            state,
            metriken,
            health,
        } = self;

        let observability = if config.observability.aktiviert {
            let addr: SocketAddr = config
                .observability_bind_adresse()
                .parse()
                .context("Ungueltige Observability-Adresse")?;
            let abbruch = state.shutdown.clone();
            Some(tokio::spawn(observability_server_starten(
                addr,
                Arc::clone(&metriken),
                health.clone(),
                async move { abbruch.cancelled().await },
            )))
        } else {
            None
        };

        let signal_state = Arc::clone(&state);
        let signal_health = health.clone();
        let signal = async move {
            shutdown.await;
            tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
            signal_health.herunterfahren_melden();
            // beendet offene WebSocket-Verbindungen, sonst wartet serve ewig
            signal_state.shutdown.cancel();
        };

        let app = ws_router(Arc::clone(&state)).layer(TraceLayer::new_for_http());

        tracing::info!(
            server_name = %config.server.name,
            adresse = %adresse,
            pfad = %config.netzwerk.ws_pfad,
            "Server laeuft"
        );

        let ergebnis = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await;

        state.herunterfahren().await;
        token_cleanup.abort();

        if let Some(task) = observability {
            match task.await {
                Ok(Err(e)) => tracing::warn!(fehler = %e, "Observability-Server mit Fehler beendet"),
                Err(e) => tracing::warn!(fehler = %e, "Observability-Task abgebrochen"),
                Ok(Ok(())) => {}
            }
        }

        ergebnis.context("WebSocket-Server mit Fehler beendet")?;
        tracing::info!("Server beendet");
        Ok(())
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(fehler = %e, "Ctrl-C-Handler nicht verfuegbar");
        std::future::pending::<()>().await;
    }
}
