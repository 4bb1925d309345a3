//! Begrenzter Pool fuer Hintergrund-Aufgaben
//!
//! Benachrichtigungen (offline, gelesen, Presenz) laufen hier ausserhalb des
//! Registry-Tasks und ausserhalb der Leseschleife. Jede Aufgabe wird
//! hoechstens einmal ausgefuehrt; ist der Pool voll, wird sie verworfen und
//! geloggt. Was nicht verloren gehen darf (Offline-Nachrichten beim
//! Verbinden) geht ueber `einreichen_wartend` und wartet auf einen Platz.

use plauder_observability::PlauderMetrics;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

/// Standard: gleichzeitig laufende Aufgaben
pub const DEFAULT_MAX_AUFGABEN: usize = 1024;

#[derive(Clone)]
pub struct AufgabenPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    plaetze: Arc<Semaphore>,
    tracker: TaskTracker,
    metriken: Arc<PlauderMetrics>,
}

impl AufgabenPool {
    pub fn neu(max_gleichzeitig: usize, metriken: Arc<PlauderMetrics>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                plaetze: Arc::new(Semaphore::new(max_gleichzeitig.max(1))),
                tracker: TaskTracker::new(),
                metriken,
            }),
        }
    }

    /// Startet `aufgabe` wenn ein Platz frei ist
    ///
    /// Gibt `false` zurueck wenn der Pool voll ist oder heruntergefahren wird.
    pub fn einreichen<F>(&self, name: &'static str, aufgabe: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.inner.tracker.is_closed() {
            tracing::debug!(aufgabe = name, "Pool wird heruntergefahren, Aufgabe verworfen");
            return false;
        }

        let platz = match Arc::clone(&self.inner.plaetze).try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                self.inner.metriken.aufgaben_verworfen_total.inc();
                tracing::warn!(aufgabe = name, "Aufgaben-Pool voll, Aufgabe verworfen");
                return false;
            }
        };

        self.inner.tracker.spawn(async move {
            let _platz = platz;
            aufgabe.await;
        });
        true
    }

    /// Wie `einreichen`, wartet aber auf einen freien Platz
    ///
    /// Gibt nur `false` zurueck wenn der Pool heruntergefahren wird.
    pub async fn einreichen_wartend<F>(&self, name: &'static str, aufgabe: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.inner.tracker.is_closed() {
            tracing::debug!(aufgabe = name, "Pool wird heruntergefahren, Aufgabe verworfen");
            return false;
        }

        let platz = match Arc::clone(&self.inner.plaetze).acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                tracing::debug!(aufgabe = name, "Pool geschlossen waehrend des Wartens");
                return false;
            }
        };

        self.inner.tracker.spawn(async move {
            let _platz = platz;
            aufgabe.await;
        });
        true
    }

    /// Anzahl gerade laufender Aufgaben
    pub fn laufend(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Nimmt keine neuen Aufgaben mehr an und wartet auf die laufenden
    pub async fn herunterfahren(&self) {
        self.inner.tracker.close();
        // Wartende in `einreichen_wartend` geben auf
        self.inner.plaetze.close();
        self.inner.tracker.wait().await;
        tracing::debug!("Aufgaben-Pool leer");
    }
}
