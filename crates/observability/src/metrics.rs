//! Prometheus-kompatible Metriken fuer Plauder
//!
//! Registrierte Metriken:
//! - `plauder_sessions_online` – Gauge: Aktuell registrierte Sessions
//! - `plauder_verbindungen_total` – Counter: Angenommene WebSocket-Verbindungen
//! - `plauder_verdraengungen_total` – Counter: Sessions durch Neuanmeldung ersetzt
//! - `plauder_entfernungen_total` – Counter: Zwangsweise entfernte Sessions (grund)
//! - `plauder_umschlaege_total` – Counter: Eingehende Umschlaege (art)
//! - `plauder_zustellungen_total` – Counter: Zustellversuche (ergebnis)
//! - `plauder_aufgaben_verworfen_total` – Counter: Vom Task-Pool abgelehnte Aufgaben
//! - `plauder_verarbeitung_seconds` – Histogram: Dauer der Umschlag-Verarbeitung

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Plauder-Prometheus-Metriken
#[derive(Clone)]
pub struct PlauderMetrics {
    pub registry: Arc<Registry>,

    // Session-Metriken
    pub sessions_online: IntGauge,
    pub verbindungen_total: IntCounter,
    pub verdraengungen_total: IntCounter,
    pub entfernungen_total: IntCounterVec,

    // Routing-Metriken
    pub umschlaege_total: IntCounterVec,
    pub zustellungen_total: IntCounterVec,
    pub verarbeitung_seconds: HistogramVec,

    // Hintergrund-Aufgaben
    pub aufgaben_verworfen_total: IntCounter,
}

impl PlauderMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let sessions_online = IntGauge::with_opts(Opts::new(
            "plauder_sessions_online",
            "Anzahl aktuell registrierter Sessions",
        ))?;
        registry.register(Box::new(sessions_online.clone()))?;

        let verbindungen_total = IntCounter::with_opts(Opts::new(
            "plauder_verbindungen_total",
            "Gesamtanzahl angenommener WebSocket-Verbindungen",
        ))?;
        registry.register(Box::new(verbindungen_total.clone()))?;

        let verdraengungen_total = IntCounter::with_opts(Opts::new(
            "plauder_verdraengungen_total",
            "Sessions die durch eine neuere Anmeldung ersetzt wurden",
        ))?;
        registry.register(Box::new(verdraengungen_total.clone()))?;

        let entfernungen_total = IntCounterVec::new(
            Opts::new(
                "plauder_entfernungen_total",
                "Zwangsweise entfernte Sessions nach Grund",
            ),
            &["grund"],
        )?;
        registry.register(Box::new(entfernungen_total.clone()))?;

        let umschlaege_total = IntCounterVec::new(
            Opts::new("plauder_umschlaege_total", "Eingehende Umschlaege nach Art"),
            &["art"],
        )?;
        registry.register(Box::new(umschlaege_total.clone()))?;

        let zustellungen_total = IntCounterVec::new(
            Opts::new("plauder_zustellungen_total", "Zustellversuche nach Ergebnis"),
            &["ergebnis"],
        )?;
        registry.register(Box::new(zustellungen_total.clone()))?;

        let verarbeitung_seconds = HistogramVec::new(
            HistogramOpts::new(
                "plauder_verarbeitung_seconds",
                "Dauer der Umschlag-Verarbeitung in Sekunden",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0]),
            &["art"],
        )?;
        registry.register(Box::new(verarbeitung_seconds.clone()))?;

        let aufgaben_verworfen_total = IntCounter::with_opts(Opts::new(
            "plauder_aufgaben_verworfen_total",
            "Hintergrund-Aufgaben die wegen voller Queue verworfen wurden",
        ))?;
        registry.register(Box::new(aufgaben_verworfen_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            sessions_online,
            verbindungen_total,
            verdraengungen_total,
            entfernungen_total,
            umschlaege_total,
            zustellungen_total,
            verarbeitung_seconds,
            aufgaben_verworfen_total,
        })
    }

    /// Zaehlt eine zwangsweise entfernte Session
    pub fn entfernung(&self, grund: &str) {
        self.entfernungen_total.with_label_values(&[grund]).inc();
    }

    /// Zaehlt einen Zustellversuch
    pub fn zustellung(&self, zugestellt: bool) {
        let ergebnis = if zugestellt { "zugestellt" } else { "offline" };
        self.zustellungen_total.with_label_values(&[ergebnis]).inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: Arc<PlauderMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<Arc<PlauderMetrics>>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
