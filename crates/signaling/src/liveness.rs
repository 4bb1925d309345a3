//! Liveness-Monitor – entfernt Sessions ohne Heartbeat
//!
//! Jede `intervall` werden alle Zaehler um eins erhoeht. Ein `ping` des
//! Clients setzt seinen Zaehler zurueck. Wer die Schwelle erreicht, wird
//! ueber den normalen Abmeldeweg entfernt und offline gemeldet.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::registry::SessionRegistry;

pub const DEFAULT_INTERVALL: Duration = Duration::from_secs(15);
pub const DEFAULT_SCHWELLE: u32 = 2;

pub struct LivenessMonitor {
    registry: SessionRegistry,
    intervall: Duration,
    schwelle: u32,
}

impl LivenessMonitor {
    pub fn neu(registry: SessionRegistry, intervall: Duration, schwelle: u32) -> Self {
        Self {
            registry,
            intervall,
            schwelle: schwelle.max(1),
        }
    }

    /// Startet den periodischen Task; endet mit `abbruch`
    pub fn starten(self, abbruch: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(
                tokio::time::Instant::now() + self.intervall,
                self.intervall,
            );
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = abbruch.cancelled() => break,
                    _ = ticker.tick() => {
                        let entfernt = self.registry.heartbeats_pruefen(self.schwelle).await;
                        if !entfernt.is_empty() {
                            tracing::info!(anzahl = entfernt.len(), "Tote Sessions entfernt");
                        }
                    }
                }
            }
            tracing::debug!("Liveness-Monitor beendet");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aufgaben::AufgabenPool;
    use crate::registry::{OfflineBeobachter, RegistryConfig};
    use crate::session::Session;
    use async_trait::async_trait;
    use plauder_core::UserId;
    use plauder_observability::PlauderMetrics;
    use std::sync::Arc;

    struct Still;

    #[async_trait]
    impl OfflineBeobachter for Still {
        async fn offline(&self, _user_id: UserId) {}
    }

    fn registry() -> SessionRegistry {
        let metriken = Arc::new(PlauderMetrics::neu().unwrap());
        let (registry, aktor) = SessionRegistry::neu(RegistryConfig::default());
        aktor.starten(
            Arc::new(Still),
            AufgabenPool::neu(8, Arc::clone(&metriken)),
            metriken,
        );
        registry
    }

    #[tokio::test(start_paused = true)]
    async fn stille_session_nach_zwei_durchlaeufen_entfernt() {
        let registry = registry();
        let (session, _rx) = Session::neu(UserId(1), 4);
        registry.registrieren(Arc::clone(&session)).await.unwrap();

        let abbruch = CancellationToken::new();
        let handle = LivenessMonitor::neu(registry.clone(), DEFAULT_INTERVALL, DEFAULT_SCHWELLE)
            .starten(abbruch.clone());

        // nach dem ersten Durchlauf noch da
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(registry.ist_online(UserId(1)).await);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(!registry.ist_online(UserId(1)).await);
        assert!(session.ist_geschlossen());

        abbruch.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn regelmaessiger_ping_haelt_session_am_leben() {
        let registry = registry();
        let (session, _rx) = Session::neu(UserId(2), 4);
        registry.registrieren(Arc::clone(&session)).await.unwrap();

        let abbruch = CancellationToken::new();
        let handle = LivenessMonitor::neu(registry.clone(), DEFAULT_INTERVALL, DEFAULT_SCHWELLE)
            .starten(abbruch.clone());

        // versetzt zu den Durchlaeufen bei 15 s, 30 s, ...
        tokio::time::sleep(Duration::from_secs(7)).await;
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_secs(15)).await;
            session.heartbeat_zuruecksetzen();
        }
        assert!(registry.ist_online(UserId(2)).await);
        assert!(!session.ist_geschlossen());

        abbruch.cancel();
        handle.await.unwrap();
    }
}
