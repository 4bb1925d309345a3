//! Verbindungsadapter – betreibt eine einzelne Duplex-Verbindung
//!
//! Der Adapter kennt nur `Frame`s: Eingang ist ein `Stream` von Frames,
//! Ausgang ein `Sink`. Der WebSocket-Endpunkt uebersetzt seine Nachrichten
//! davor und dahinter; Tests benutzen kanalbasierte Attrappen.
//!
//! ## Schleifen
//! - Leseschleife: Frames lesen, Groesse pruefen, Nutzlast an den Router.
//!   Kommt laenger als `lese_frist` gar nichts an (auch kein Pong), gilt die
//!   Verbindung als halb offen.
//! - Schreibschleife: Session-Queue leeren (mehrere Eintraege pro Flush),
//!   Keepalive-Ping wenn seit dem letzten Tick nichts geschrieben wurde.
//!   Jeder Schreibvorgang ist durch `schreib_frist` begrenzt und endet
//!   sofort beim Abbruch.
//!
//! Endet eine Schleife, bricht sie die andere ab. Abgemeldet wird genau
//! einmal, nachdem beide beendet sind.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use plauder_protocol::{Frame, DEFAULT_MAX_FRAME_SIZE};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::registry::SessionRegistry;
use crate::session::{Session, DEFAULT_QUEUE_GROESSE};

/// Verarbeitet die Nutzlast eines Text- oder Binaer-Frames
#[async_trait]
pub trait UmschlagVerarbeiter: Send + Sync {
    async fn verarbeiten(&self, session: &Arc<Session>, roh: Bytes);
}

/// Einstellungen pro Verbindung
#[derive(Debug, Clone)]
pub struct VerbindungsConfig {
    pub max_frame_bytes: usize,
    pub queue_groesse: usize,
    pub keepalive: Duration,
    /// Maximal so viele Queue-Eintraege pro Flush
    pub schreib_batch: usize,
    /// Obergrenze fuer einen einzelnen Schreibvorgang samt Flush
    pub schreib_frist: Duration,
    /// Ohne eingehenden Frame laenger als das: Verbindung trennen
    pub lese_frist: Duration,
}

impl Default for VerbindungsConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
            queue_groesse: DEFAULT_QUEUE_GROESSE,
            keepalive: Duration::from_secs(54),
            schreib_batch: 64,
            schreib_frist: Duration::from_secs(10),
            lese_frist: Duration::from_secs(60),
        }
    }
}

/// Warum die Leseschleife endete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeseEnde {
    Abgebrochen,
    VomClientGeschlossen,
    FrameZuGross,
    Lesefehler,
    /// Innerhalb der Lesefrist kam kein Frame
    Zeitueberschreitung,
}

/// Warum die Schreibschleife endete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchreibEnde {
    Abgebrochen,
    SessionGeschlossen,
    Schreibfehler,
    /// Die Gegenstelle nimmt nichts mehr ab
    Zeitueberschreitung,
}

/// Betreibt die Verbindung bis eine Seite endet
///
/// Die Session muss bereits registriert sein. Nach dem Ende ist sie
/// geschlossen und abgemeldet.
#[allow(clippy::too_many_arguments)]
pub async fn verbindung_betreiben<S, K, E>(
    eingang: S,
    ausgang: K,
    session: Arc<Session>,
    queue: mpsc::Receiver<Bytes>,
    registry: SessionRegistry,
    verarbeiter: Arc<dyn UmschlagVerarbeiter>,
    config: VerbindungsConfig,
    shutdown: CancellationToken,
) -> (LeseEnde, SchreibEnde)
where
    S: Stream<Item = Result<Frame, E>> + Unpin + Send,
    K: Sink<Frame> + Unpin + Send + 'static,
    K::Error: Display,
    E: Display + Send,
{
    let user_id = session.user_id();
    let abbruch = shutdown.child_token();

    let schreiber = tokio::spawn(schreib_schleife(
        ausgang,
        queue,
        SchreibTakt {
            keepalive: config.keepalive,
            batch: config.schreib_batch.max(1),
            frist: config.schreib_frist,
        },
        abbruch.clone(),
    ));

    let lese_ende = lese_schleife(
        eingang,
        &session,
        &*verarbeiter,
        config.max_frame_bytes,
        config.lese_frist,
        &abbruch,
    )
    .await;
    abbruch.cancel();

    let schreib_ende = match schreiber.await {
        Ok(ende) => ende,
        Err(e) => {
            tracing::error!(user_id = %user_id, fehler = %e, "Schreib-Task abgebrochen");
            SchreibEnde::Schreibfehler
        }
    };

    registry.abmelden(user_id, session.id()).await;
    session.schliessen();

    tracing::info!(
        user_id = %user_id,
        lesen = ?lese_ende,
        schreiben = ?schreib_ende,
        "Verbindung beendet"
    );
    (lese_ende, schreib_ende)
}

async fn lese_schleife<S, E>(
    mut eingang: S,
    session: &Arc<Session>,
    verarbeiter: &dyn UmschlagVerarbeiter,
    max_frame_bytes: usize,
    lese_frist: Duration,
    abbruch: &CancellationToken,
) -> LeseEnde
where
    S: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
{
    let user_id = session.user_id();
    loop {
        // jeder Frame verlaengert die Frist, Pongs eingeschlossen
        let frame = tokio::select! {
            _ = abbruch.cancelled() => return LeseEnde::Abgebrochen,
            frame = tokio::time::timeout(lese_frist, eingang.next()) => frame,
        };

        let frame = match frame {
            Err(_) => {
                tracing::info!(
                    user_id = %user_id,
                    frist_sek = lese_frist.as_secs(),
                    "Keine Frames innerhalb der Lesefrist, Verbindung wird getrennt"
                );
                return LeseEnde::Zeitueberschreitung;
            }
            Ok(frame) => frame,
        };

        let frame = match frame {
            Some(Ok(f)) => f,
            Some(Err(e)) => {
                tracing::debug!(user_id = %user_id, fehler = %e, "Lesefehler");
                return LeseEnde::Lesefehler;
            }
            None => return LeseEnde::VomClientGeschlossen,
        };

        if frame.laenge() > max_frame_bytes {
            tracing::warn!(
                user_id = %user_id,
                laenge = frame.laenge(),
                max = max_frame_bytes,
                "Frame zu gross, Verbindung wird getrennt"
            );
            return LeseEnde::FrameZuGross;
        }

        match frame {
            Frame::Text(daten) | Frame::Binary(daten) => {
                verarbeiter.verarbeiten(session, daten).await;
            }
            Frame::Close => return LeseEnde::VomClientGeschlossen,
            // Transport-Pings beantwortet die WebSocket-Schicht; beide
            // zaehlen nur fuer die Lesefrist
            Frame::Ping(_) | Frame::Pong(_) => {}
        }
    }
}

/// Zeitvorgaben der Schreibschleife
#[derive(Debug, Clone, Copy)]
struct SchreibTakt {
    keepalive: Duration,
    batch: usize,
    frist: Duration,
}

async fn schreib_schleife<K>(
    mut ausgang: K,
    mut queue: mpsc::Receiver<Bytes>,
    takt: SchreibTakt,
    abbruch: CancellationToken,
) -> SchreibEnde
where
    K: Sink<Frame> + Unpin,
    K::Error: Display,
{
    let mut ticker =
        tokio::time::interval_at(tokio::time::Instant::now() + takt.keepalive, takt.keepalive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut geschrieben_seit_tick = false;

    let ende = loop {
        tokio::select! {
            _ = abbruch.cancelled() => break SchreibEnde::Abgebrochen,

            naechste = queue.recv() => {
                let Some(daten) = naechste else {
                    // ein nicht zustellbares Close aendert nichts am Grund
                    let close = ausgang.send(Frame::Close);
                    let _ = begrenzt(&abbruch, takt.frist, close).await;
                    break SchreibEnde::SessionGeschlossen;
                };

                let batch = batch_schreiben(&mut ausgang, &mut queue, daten, takt.batch);
                if let Err(ende) = begrenzt(&abbruch, takt.frist, batch).await {
                    break ende;
                }
                geschrieben_seit_tick = true;
            }

            _ = ticker.tick() => {
                if !geschrieben_seit_tick {
                    let ping = ausgang.send(Frame::Ping(Bytes::new()));
                    if let Err(ende) = begrenzt(&abbruch, takt.frist, ping).await {
                        break ende;
                    }
                }
                geschrieben_seit_tick = false;
            }
        }
    };

    abbruch.cancel();
    ende
}

/// Fuehrt einen Schreibvorgang aus, hoechstens `frist` lang und nur bis
/// zum Abbruch
async fn begrenzt<F, E>(
    abbruch: &CancellationToken,
    frist: Duration,
    schreiben: F,
) -> Result<(), SchreibEnde>
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    tokio::select! {
        _ = abbruch.cancelled() => Err(SchreibEnde::Abgebrochen),
        ergebnis = tokio::time::timeout(frist, schreiben) => match ergebnis {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::debug!(fehler = %e, "Schreibfehler");
                Err(SchreibEnde::Schreibfehler)
            }
            Err(_) => {
                tracing::warn!(
                    frist_ms = frist.as_millis() as u64,
                    "Schreibvorgang haengt, Verbindung wird getrennt"
                );
                Err(SchreibEnde::Zeitueberschreitung)
            }
        },
    }
}

/// Schreibt `erste` und bis zu `batch - 1` bereits wartende Eintraege mit
/// einem einzigen Flush
async fn batch_schreiben<K>(
    ausgang: &mut K,
    queue: &mut mpsc::Receiver<Bytes>,
    erste: Bytes,
    batch: usize,
) -> Result<(), K::Error>
where
    K: Sink<Frame> + Unpin,
{
    ausgang.feed(Frame::Text(erste)).await?;
    for _ in 1..batch {
        match queue.try_recv() {
            Ok(daten) => ausgang.feed(Frame::Text(daten)).await?,
            Err(_) => break,
        }
    }
    ausgang.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aufgaben::AufgabenPool;
    use crate::registry::{OfflineBeobachter, RegistryConfig};
    use futures_util::{future, sink, stream};
    use parking_lot::Mutex;
    use plauder_core::UserId;
    use plauder_observability::PlauderMetrics;
    use std::pin::Pin;

    #[derive(Default)]
    struct Sammler {
        empfangen: Mutex<Vec<Bytes>>,
    }

    #[async_trait]
    impl UmschlagVerarbeiter for Sammler {
        async fn verarbeiten(&self, _session: &Arc<Session>, roh: Bytes) {
            self.empfangen.lock().push(roh);
        }
    }

    #[derive(Default)]
    struct OfflineZaehler {
        offline: Mutex<Vec<UserId>>,
    }

    #[async_trait]
    impl OfflineBeobachter for OfflineZaehler {
        async fn offline(&self, user_id: UserId) {
            self.offline.lock().push(user_id);
        }
    }

    type Eingang = Pin<Box<dyn Stream<Item = Result<Frame, String>> + Send>>;
    type Ausgang = Pin<Box<dyn Sink<Frame, Error = String> + Send>>;

    /// Kanalbasierte Attrappe einer Verbindung
    fn attrappe() -> (
        mpsc::UnboundedSender<Result<Frame, String>>,
        Eingang,
        mpsc::UnboundedReceiver<Frame>,
        Ausgang,
    ) {
        let (ein_tx, ein_rx) = mpsc::unbounded_channel::<Result<Frame, String>>();
        let eingang = stream::unfold(ein_rx, |mut rx| async move {
            rx.recv().await.map(|f| (f, rx))
        });

        let (aus_tx, aus_rx) = mpsc::unbounded_channel::<Frame>();
        let ausgang = sink::unfold(aus_tx, |tx, frame: Frame| async move {
            tx.send(frame).map_err(|_| "Gegenstelle weg".to_string())?;
            Ok::<_, String>(tx)
        });

        (ein_tx, Box::pin(eingang), aus_rx, Box::pin(ausgang))
    }

    /// Gegenstelle die nichts mehr abnimmt
    fn haengender_ausgang() -> Ausgang {
        Box::pin(sink::unfold((), |_, _frame: Frame| {
            future::pending::<Result<(), String>>()
        }))
    }

    /// Gegenstelle deren Schreibvorgaenge fehlschlagen
    fn kaputter_ausgang() -> Ausgang {
        Box::pin(sink::unfold((), |_, _frame: Frame| async {
            Err::<(), String>("Broken pipe".into())
        }))
    }

    struct Aufbau {
        registry: SessionRegistry,
        beobachter: Arc<OfflineZaehler>,
        aufgaben: AufgabenPool,
    }

    fn aufbau() -> Aufbau {
        let metriken = Arc::new(PlauderMetrics::neu().unwrap());
        let aufgaben = AufgabenPool::neu(8, Arc::clone(&metriken));
        let beobachter = Arc::new(OfflineZaehler::default());
        let (registry, aktor) = SessionRegistry::neu(RegistryConfig::default());
        aktor.starten(beobachter.clone(), aufgaben.clone(), metriken);
        Aufbau {
            registry,
            beobachter,
            aufgaben,
        }
    }

    fn text(s: &'static str) -> Result<Frame, String> {
        Ok(Frame::Text(Bytes::from_static(s.as_bytes())))
    }

    #[tokio::test]
    async fn frames_in_reihenfolge_an_verarbeiter() {
        let a = aufbau();
        let (session, queue) = Session::neu(UserId(1), 8);
        a.registry.registrieren(Arc::clone(&session)).await.unwrap();
        let (ein_tx, eingang, _aus_rx, ausgang) = attrappe();
        let sammler = Arc::new(Sammler::default());

        ein_tx.send(text("eins")).unwrap();
        ein_tx.send(Ok(Frame::Ping(Bytes::new()))).unwrap();
        ein_tx.send(text("zwei")).unwrap();
        ein_tx.send(Ok(Frame::Close)).unwrap();

        let (lesen, _) = verbindung_betreiben(
            eingang,
            ausgang,
            Arc::clone(&session),
            queue,
            a.registry.clone(),
            sammler.clone(),
            VerbindungsConfig::default(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(lesen, LeseEnde::VomClientGeschlossen);
        assert_eq!(
            *sammler.empfangen.lock(),
            vec![Bytes::from_static(b"eins"), Bytes::from_static(b"zwei")]
        );
        assert!(session.ist_geschlossen());
        assert!(!a.registry.ist_online(UserId(1)).await);

        a.aufgaben.herunterfahren().await;
        assert_eq!(*a.beobachter.offline.lock(), vec![UserId(1)]);
    }

    #[tokio::test]
    async fn zu_grosser_frame_trennt() {
        let a = aufbau();
        let (session, queue) = Session::neu(UserId(2), 8);
        a.registry.registrieren(Arc::clone(&session)).await.unwrap();
        let (ein_tx, eingang, _aus_rx, ausgang) = attrappe();
        let sammler = Arc::new(Sammler::default());

        ein_tx.send(Ok(Frame::Text(Bytes::from(vec![b'x'; 33])))).unwrap();

        let config = VerbindungsConfig {
            max_frame_bytes: 32,
            ..VerbindungsConfig::default()
        };
        let (lesen, _) = verbindung_betreiben(
            eingang,
            ausgang,
            session,
            queue,
            a.registry.clone(),
            sammler.clone(),
            config,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(lesen, LeseEnde::FrameZuGross);
        assert!(sammler.empfangen.lock().is_empty());
        assert!(!a.registry.ist_online(UserId(2)).await);
    }

    #[tokio::test]
    async fn lesefehler_trennt_und_meldet_ab() {
        let a = aufbau();
        let (session, queue) = Session::neu(UserId(3), 8);
        a.registry.registrieren(Arc::clone(&session)).await.unwrap();
        let (ein_tx, eingang, _aus_rx, ausgang) = attrappe();

        ein_tx.send(Err("Verbindung zurueckgesetzt".into())).unwrap();

        let (lesen, schreiben) = verbindung_betreiben(
            eingang,
            ausgang,
            session,
            queue,
            a.registry.clone(),
            Arc::new(Sammler::default()),
            VerbindungsConfig::default(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(lesen, LeseEnde::Lesefehler);
        assert_eq!(schreiben, SchreibEnde::Abgebrochen);
        assert!(!a.registry.ist_online(UserId(3)).await);
    }

    #[tokio::test]
    async fn geschlossene_session_sendet_close_und_beendet() {
        let a = aufbau();
        let (session, queue) = Session::neu(UserId(4), 8);
        a.registry.registrieren(Arc::clone(&session)).await.unwrap();
        let (_ein_tx, eingang, mut aus_rx, ausgang) = attrappe();

        assert!(a.registry.an_user_senden(UserId(4), Bytes::from_static(b"a")).await);
        assert!(a.registry.an_user_senden(UserId(4), Bytes::from_static(b"b")).await);

        // zweite Anmeldung schliesst diese Session
        let (neu, _neu_queue) = Session::neu(UserId(4), 8);
        a.registry.registrieren(Arc::clone(&neu)).await.unwrap();

        let (lesen, schreiben) = verbindung_betreiben(
            eingang,
            ausgang,
            session,
            queue,
            a.registry.clone(),
            Arc::new(Sammler::default()),
            VerbindungsConfig::default(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(schreiben, SchreibEnde::SessionGeschlossen);
        assert_eq!(lesen, LeseEnde::Abgebrochen);

        let mut frames = Vec::new();
        while let Ok(f) = aus_rx.try_recv() {
            frames.push(f);
        }
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0], Frame::Text(Bytes::from_static(b"a")));
        assert_eq!(frames[1], Frame::Text(Bytes::from_static(b"b")));
        assert!(matches!(&frames[2], Frame::Text(b) if b.starts_with(b"{\"type\":\"forced_logout\"")));
        assert_eq!(frames[3], Frame::Close);

        // die verdraengte Verbindung meldet die neue nicht ab
        assert_eq!(a.registry.aktuelle_session(UserId(4)).await, Some(neu.id()));
    }

    #[tokio::test]
    async fn shutdown_bricht_beide_schleifen_ab() {
        let a = aufbau();
        let (session, queue) = Session::neu(UserId(5), 8);
        a.registry.registrieren(Arc::clone(&session)).await.unwrap();
        let (_ein_tx, eingang, _aus_rx, ausgang) = attrappe();

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(verbindung_betreiben(
            eingang,
            ausgang,
            session,
            queue,
            a.registry.clone(),
            Arc::new(Sammler::default()),
            VerbindungsConfig::default(),
            shutdown.clone(),
        ));

        shutdown.cancel();
        let (lesen, schreiben) = task.await.unwrap();
        assert_eq!(lesen, LeseEnde::Abgebrochen);
        assert_eq!(schreiben, SchreibEnde::Abgebrochen);
        assert!(!a.registry.ist_online(UserId(5)).await);
    }

    #[tokio::test]
    async fn haengender_ausgang_verhindert_abmeldung_nicht() {
        let a = aufbau();
        let (session, queue) = Session::neu(UserId(42), 8);
        a.registry.registrieren(Arc::clone(&session)).await.unwrap();
        let (ein_tx, eingang, _aus_rx, _ausgang) = attrappe();

        assert!(a.registry.an_user_senden(UserId(42), Bytes::from_static(b"x")).await);
        ein_tx.send(Ok(Frame::Close)).unwrap();

        let task = tokio::spawn(verbindung_betreiben(
            eingang,
            haengender_ausgang(),
            Arc::clone(&session),
            queue,
            a.registry.clone(),
            Arc::new(Sammler::default()),
            VerbindungsConfig::default(),
            CancellationToken::new(),
        ));

        let (lesen, schreiben) = tokio::time::timeout(Duration::from_secs(3), task)
            .await
            .expect("Verbindung muss trotz haengendem Schreiben enden")
            .unwrap();
        assert_eq!(lesen, LeseEnde::VomClientGeschlossen);
        assert_eq!(schreiben, SchreibEnde::Abgebrochen);
        assert!(session.ist_geschlossen());
        assert!(!a.registry.ist_online(UserId(42)).await);

        a.aufgaben.herunterfahren().await;
        assert_eq!(*a.beobachter.offline.lock(), vec![UserId(42)]);
    }

    #[tokio::test(start_paused = true)]
    async fn schreibfrist_trennt_stumme_gegenstelle() {
        let a = aufbau();
        let (session, queue) = Session::neu(UserId(43), 8);
        a.registry.registrieren(Arc::clone(&session)).await.unwrap();
        // Eingang bleibt offen, nur das Schreiben haengt
        let (_ein_tx, eingang, _aus_rx, _ausgang) = attrappe();

        assert!(a.registry.an_user_senden(UserId(43), Bytes::from_static(b"x")).await);

        let config = VerbindungsConfig {
            schreib_frist: Duration::from_secs(10),
            ..VerbindungsConfig::default()
        };
        let (lesen, schreiben) = verbindung_betreiben(
            eingang,
            haengender_ausgang(),
            session,
            queue,
            a.registry.clone(),
            Arc::new(Sammler::default()),
            config,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(schreiben, SchreibEnde::Zeitueberschreitung);
        assert_eq!(lesen, LeseEnde::Abgebrochen);
        assert!(!a.registry.ist_online(UserId(43)).await);
    }

    #[tokio::test]
    async fn schreibfehler_beendet_verbindung_und_meldet_ab() {
        let a = aufbau();
        let (session, queue) = Session::neu(UserId(44), 8);
        a.registry.registrieren(Arc::clone(&session)).await.unwrap();
        let (_ein_tx, eingang, _aus_rx, _ausgang) = attrappe();

        assert!(a.registry.an_user_senden(UserId(44), Bytes::from_static(b"x")).await);

        let (lesen, schreiben) = verbindung_betreiben(
            eingang,
            kaputter_ausgang(),
            Arc::clone(&session),
            queue,
            a.registry.clone(),
            Arc::new(Sammler::default()),
            VerbindungsConfig::default(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(schreiben, SchreibEnde::Schreibfehler);
        assert_eq!(lesen, LeseEnde::Abgebrochen);
        assert!(session.ist_geschlossen());
        assert!(!a.registry.ist_online(UserId(44)).await);

        a.aufgaben.herunterfahren().await;
        assert_eq!(*a.beobachter.offline.lock(), vec![UserId(44)]);
    }

    #[tokio::test(start_paused = true)]
    async fn lesefrist_erkennt_halboffene_verbindung() {
        let a = aufbau();
        let (session, queue) = Session::neu(UserId(45), 8);
        a.registry.registrieren(Arc::clone(&session)).await.unwrap();
        let (ein_tx, eingang, _aus_rx, ausgang) = attrappe();

        let config = VerbindungsConfig {
            lese_frist: Duration::from_secs(60),
            ..VerbindungsConfig::default()
        };
        let task = tokio::spawn(verbindung_betreiben(
            eingang,
            ausgang,
            session,
            queue,
            a.registry.clone(),
            Arc::new(Sammler::default()),
            config,
            CancellationToken::new(),
        ));

        // ein Pong bei 50 s verschiebt die Frist auf 110 s
        tokio::time::sleep(Duration::from_secs(50)).await;
        ein_tx.send(Ok(Frame::Pong(Bytes::new()))).unwrap();
        tokio::time::sleep(Duration::from_secs(50)).await;
        assert!(!task.is_finished());
        assert!(a.registry.ist_online(UserId(45)).await);

        tokio::time::sleep(Duration::from_secs(20)).await;
        let (lesen, schreiben) = task.await.unwrap();
        assert_eq!(lesen, LeseEnde::Zeitueberschreitung);
        assert_eq!(schreiben, SchreibEnde::Abgebrochen);
        assert!(!a.registry.ist_online(UserId(45)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_nur_ohne_verkehr() {
        let (queue_tx, queue_rx) = mpsc::channel(8);
        let (_ein_tx, _eingang, mut aus_rx, ausgang) = attrappe();
        let abbruch = CancellationToken::new();
        let task = tokio::spawn(schreib_schleife(
            ausgang,
            queue_rx,
            SchreibTakt {
                keepalive: Duration::from_secs(54),
                batch: 64,
                frist: Duration::from_secs(10),
            },
            abbruch.clone(),
        ));

        // Verkehr im ersten Intervall: kein Ping beim ersten Tick
        queue_tx.send(Bytes::from_static(b"x")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(55)).await;
        assert_eq!(aus_rx.try_recv().unwrap(), Frame::Text(Bytes::from_static(b"x")));
        assert!(aus_rx.try_recv().is_err());

        // stilles Intervall: Ping
        tokio::time::sleep(Duration::from_secs(54)).await;
        assert_eq!(aus_rx.try_recv().unwrap(), Frame::Ping(Bytes::new()));

        abbruch.cancel();
        assert_eq!(task.await.unwrap(), SchreibEnde::Abgebrochen);
    }

    #[tokio::test]
    async fn batch_schreibt_wartende_eintraege() {
        let (queue_tx, mut queue_rx) = mpsc::channel(8);
        for s in [&b"2"[..], b"3", b"4"] {
            queue_tx.send(Bytes::copy_from_slice(s)).await.unwrap();
        }
        let (_ein_tx, _eingang, mut aus_rx, mut ausgang) = attrappe();

        batch_schreiben(&mut ausgang, &mut queue_rx, Bytes::from_static(b"1"), 3)
            .await
            .unwrap();

        let mut frames = Vec::new();
        while let Ok(f) = aus_rx.try_recv() {
            frames.push(f);
        }
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2], Frame::Text(Bytes::from_static(b"3")));
        // der vierte Eintrag wartet auf den naechsten Flush
        assert_eq!(queue_rx.try_recv().unwrap(), Bytes::from_static(b"4"));
    }
}
