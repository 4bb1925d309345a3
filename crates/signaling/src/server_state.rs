//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt alle geteilten Dienste als Arc-Referenzen bzw. klonbare Handles,
//! die sicher zwischen tokio-Tasks geteilt werden koennen. Registry,
//! Aufgaben-Pool und Liveness-Monitor werden hier beim Start verdrahtet.

use parking_lot::Mutex;
use plauder_auth::TokenPruefer;
use plauder_db::Datenbank;
use plauder_observability::PlauderMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::aufgaben::{AufgabenPool, DEFAULT_MAX_AUFGABEN};
use crate::connection::VerbindungsConfig;
use crate::dedup::{AnrufEndeDedup, DEFAULT_FENSTER};
use crate::error::SignalingResult;
use crate::liveness::{LivenessMonitor, DEFAULT_INTERVALL, DEFAULT_SCHWELLE};
use crate::presence::PresenzDienst;
use crate::registry::{RegistryConfig, SessionRegistry};
use crate::session::Session;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Pfad des WebSocket-Endpunkts
    pub ws_pfad: String,
    pub verbindung: VerbindungsConfig,
    pub registry: RegistryConfig,
    pub liveness_intervall: Duration,
    /// Verpasste Durchlaeufe bis zur Entfernung
    pub liveness_schwelle: u32,
    pub dedup_fenster: Duration,
    pub max_aufgaben: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            ws_pfad: "/ws".to_string(),
            verbindung: VerbindungsConfig::default(),
            registry: RegistryConfig::default(),
            liveness_intervall: DEFAULT_INTERVALL,
            liveness_schwelle: DEFAULT_SCHWELLE,
            dedup_fenster: DEFAULT_FENSTER,
            max_aufgaben: DEFAULT_MAX_AUFGABEN,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    pub config: Arc<SignalingConfig>,
    /// Persistenz (Nachrichten, Gruppen, Beziehungen, Profile)
    pub db: Arc<dyn Datenbank>,
    /// Token-Pruefung beim Verbindungsaufbau
    pub pruefer: Arc<dyn TokenPruefer>,
    pub registry: SessionRegistry,
    pub aufgaben: AufgabenPool,
    pub presenz: Arc<PresenzDienst>,
    pub dedup: AnrufEndeDedup,
    pub metriken: Arc<PlauderMetrics>,
    /// Wird beim Herunterfahren ausgeloest, beendet alle Verbindungen
    pub shutdown: CancellationToken,
    hintergrund: Mutex<Vec<JoinHandle<()>>>,
}

impl SignalingState {
    /// Baut den Zustand und startet Registry und Liveness-Monitor
    pub fn starten(
        config: SignalingConfig,
        db: Arc<dyn Datenbank>,
        pruefer: Arc<dyn TokenPruefer>,
        metriken: Arc<PlauderMetrics>,
    ) -> Arc<Self> {
        let shutdown = CancellationToken::new();
        let aufgaben = AufgabenPool::neu(config.max_aufgaben, Arc::clone(&metriken));

        let (registry, aktor) = SessionRegistry::neu(config.registry.clone());
        let presenz = Arc::new(PresenzDienst::neu(Arc::clone(&db), registry.clone()));
        let registry_task = aktor.starten(presenz.clone(), aufgaben.clone(), Arc::clone(&metriken));

        let liveness_task = LivenessMonitor::neu(
            registry.clone(),
            config.liveness_intervall,
            config.liveness_schwelle,
        )
        .starten(shutdown.clone());

        tracing::info!(
            pfad = %config.ws_pfad,
            liveness_sek = config.liveness_intervall.as_secs(),
            "Signaling-Service gestartet"
        );

        Arc::new(Self {
            dedup: AnrufEndeDedup::neu(config.dedup_fenster),
            config: Arc::new(config),
            db,
            pruefer,
            registry,
            aufgaben,
            presenz,
            metriken,
            shutdown,
            hintergrund: Mutex::new(vec![registry_task, liveness_task]),
        })
    }

    /// Registriert eine neue Session und startet Online-Wechsel samt
    /// Offline-Nachrichten
    ///
    /// Die Zustellung der Offline-Nachrichten wartet bei vollem Pool auf
    /// einen Platz statt verworfen zu werden.
    pub async fn session_eroeffnen(&self, session: &Arc<Session>) -> SignalingResult<()> {
        let user_id = session.user_id();
        self.registry.registrieren(Arc::clone(session)).await?;
        self.metriken.verbindungen_total.inc();

        let presenz = Arc::clone(&self.presenz);
        if !self
            .aufgaben
            .einreichen_wartend("presenz_verbunden", async move {
                presenz.verbunden(user_id).await;
            })
            .await
        {
            tracing::debug!(user_id = %user_id, "Herunterfahren, Offline-Nachrichten entfallen");
        }
        Ok(())
    }

    /// Beendet Verbindungen, Registry und Monitor und wartet auf den Pool
    pub async fn herunterfahren(&self) {
        tracing::info!("Signaling-Service wird heruntergefahren");
        self.shutdown.cancel();
        self.registry.herunterfahren().await;

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.hintergrund.lock());
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(fehler = %e, "Hintergrund-Task nicht sauber beendet");
            }
        }
        self.aufgaben.herunterfahren().await;
    }
}
