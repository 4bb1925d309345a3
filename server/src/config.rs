//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use plauder_db::DatabaseConfig;
use plauder_observability::logging::{log_format_gueltig, log_level_gueltig};
use plauder_signaling::{RegistryConfig, SignalingConfig, VerbindungsConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerEinstellungen,
    pub netzwerk: NetzwerkEinstellungen,
    pub datenbank: DatenbankEinstellungen,
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
    /// Pro-Verbindung: Frame-Groesse, Queue, Keepalive
    pub verbindung: VerbindungEinstellungen,
    pub liveness: LivenessEinstellungen,
    pub registry: RegistryEinstellungen,
    pub router: RouterEinstellungen,
    /// Fire-and-Forget-Aufgaben
    pub aufgaben: AufgabenEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename (nur fuer Logs)
    pub name: String,
    /// Wie lange ein ausgegebenes Token gueltig ist
    pub token_ttl_sek: u64,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Plauder".into(),
            token_ttl_sek: 24 * 60 * 60,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    /// Port fuer den WebSocket-Endpunkt (0 = beliebig)
    pub ws_port: u16,
    /// Pfad des WebSocket-Endpunkts
    pub ws_pfad: String,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            ws_port: 8080,
            ws_pfad: "/ws".into(),
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Verbindungs-URL
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    pub wal: bool,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        Self {
            url: "sqlite://plauder.db".into(),
            max_verbindungen: 5,
            wal: true,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            port: 9300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbindungEinstellungen {
    /// Groesster erlaubter eingehender Frame
    pub max_frame_bytes: usize,
    /// Plaetze in der ausgehenden Queue pro Session
    pub queue_groesse: usize,
    pub keepalive_sek: u64,
    /// Queue-Eintraege pro Flush
    pub schreib_batch: usize,
    /// Obergrenze fuer einen Schreibvorgang
    pub schreib_frist_sek: u64,
    /// Ohne eingehenden Frame (auch Pong) so lange: trennen
    pub lese_frist_sek: u64,
}

impl Default for VerbindungEinstellungen {
    fn default() -> Self {
        let standard = VerbindungsConfig::default();
        Self {
            max_frame_bytes: standard.max_frame_bytes,
            queue_groesse: standard.queue_groesse,
            keepalive_sek: standard.keepalive.as_secs(),
            schreib_batch: standard.schreib_batch,
            schreib_frist_sek: standard.schreib_frist.as_secs(),
            lese_frist_sek: standard.lese_frist.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessEinstellungen {
    pub intervall_sek: u64,
    /// Verpasste Durchlaeufe bis zur Entfernung
    pub schwelle: u32,
}

impl Default for LivenessEinstellungen {
    fn default() -> Self {
        let standard = SignalingConfig::default();
        Self {
            intervall_sek: standard.liveness_intervall.as_secs(),
            schwelle: standard.liveness_schwelle,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryEinstellungen {
    /// Wie lange der `forced_logout`-Hinweis warten darf
    pub kick_timeout_ms: u64,
    /// Pause zwischen Verdraengen und Eintragen der neuen Session
    pub kulanzzeit_ms: u64,
}

impl Default for RegistryEinstellungen {
    fn default() -> Self {
        let standard = RegistryConfig::default();
        Self {
            kick_timeout_ms: standard.kick_timeout.as_millis() as u64,
            kulanzzeit_ms: standard.kulanzzeit.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterEinstellungen {
    /// Fenster fuer doppelte Anruf-Ende-Nachrichten
    pub dedup_fenster_sek: u64,
}

impl Default for RouterEinstellungen {
    fn default() -> Self {
        Self {
            dedup_fenster_sek: SignalingConfig::default().dedup_fenster.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AufgabenEinstellungen {
    pub max_gleichzeitig: usize,
}

impl Default for AufgabenEinstellungen {
    fn default() -> Self {
        Self {
            max_gleichzeitig: SignalingConfig::default().max_aufgaben,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.validieren()?;
        Ok(config)
    }

    pub fn aus_toml(inhalt: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(inhalt)
    }

    /// Lehnt Werte ab, mit denen der Server nicht sinnvoll laufen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level: {}", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format: {}", self.logging.format);
        }
        if !self.netzwerk.ws_pfad.starts_with('/') {
            anyhow::bail!("ws_pfad muss mit '/' beginnen: {}", self.netzwerk.ws_pfad);
        }
        if self.verbindung.queue_groesse == 0 || self.verbindung.max_frame_bytes == 0 {
            anyhow::bail!("queue_groesse und max_frame_bytes muessen groesser 0 sein");
        }
        if self.verbindung.schreib_frist_sek == 0 {
            anyhow::bail!("verbindung.schreib_frist_sek muss groesser 0 sein");
        }
        if self.verbindung.lese_frist_sek <= self.verbindung.keepalive_sek {
            anyhow::bail!(
                "verbindung.lese_frist_sek ({}) muss groesser als keepalive_sek ({}) sein",
                self.verbindung.lese_frist_sek,
                self.verbindung.keepalive_sek
            );
        }
        if self.liveness.intervall_sek == 0 || self.liveness.schwelle == 0 {
            anyhow::bail!("Liveness-Intervall und -Schwelle muessen groesser 0 sein");
        }
        if self.aufgaben.max_gleichzeitig == 0 {
            anyhow::bail!("aufgaben.max_gleichzeitig muss groesser 0 sein");
        }
        Ok(())
    }

    /// Bind-Adresse fuer den WebSocket-Endpunkt
    pub fn ws_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.ws_port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }

    pub fn datenbank_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.datenbank.url.clone(),
            max_verbindungen: self.datenbank.max_verbindungen,
            sqlite_wal: self.datenbank.wal,
        }
    }

    /// Uebersetzt die Datei-Einstellungen in die Laufzeit-Konfiguration
    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig {
            ws_pfad: self.netzwerk.ws_pfad.clone(),
            verbindung: VerbindungsConfig {
                max_frame_bytes: self.verbindung.max_frame_bytes,
                queue_groesse: self.verbindung.queue_groesse,
                keepalive: Duration::from_secs(self.verbindung.keepalive_sek),
                schreib_batch: self.verbindung.schreib_batch,
                schreib_frist: Duration::from_secs(self.verbindung.schreib_frist_sek),
                lese_frist: Duration::from_secs(self.verbindung.lese_frist_sek),
            },
            registry: RegistryConfig {
                kick_timeout: Duration::from_millis(self.registry.kick_timeout_ms),
                kulanzzeit: Duration::from_millis(self.registry.kulanzzeit_ms),
            },
            liveness_intervall: Duration::from_secs(self.liveness.intervall_sek),
            liveness_schwelle: self.liveness.schwelle,
            dedup_fenster: Duration::from_secs(self.router.dedup_fenster_sek),
            max_aufgaben: self.aufgaben.max_gleichzeitig,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert!(cfg.validieren().is_ok());
        assert_eq!(cfg.netzwerk.ws_pfad, "/ws");
        assert_eq!(cfg.verbindung.queue_groesse, 256);
        assert_eq!(cfg.verbindung.max_frame_bytes, 512 * 1024);
        assert_eq!(cfg.verbindung.keepalive_sek, 54);
        assert_eq!(cfg.verbindung.schreib_frist_sek, 10);
        assert_eq!(cfg.verbindung.lese_frist_sek, 60);
        assert_eq!(cfg.liveness.intervall_sek, 15);
        assert_eq!(cfg.liveness.schwelle, 2);
        assert_eq!(cfg.router.dedup_fenster_sek, 10);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.ws_bind_adresse(), "0.0.0.0:8080");
        assert_eq!(cfg.observability_bind_adresse(), "0.0.0.0:9300");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [netzwerk]
            ws_port = 9000
            ws_pfad = "/chat"

            [liveness]
            intervall_sek = 30

            [registry]
            kulanzzeit_ms = 0

            [verbindung]
            schreib_frist_sek = 5
        "#;
        let cfg = ServerConfig::aus_toml(toml).unwrap();
        assert_eq!(cfg.netzwerk.ws_port, 9000);
        assert_eq!(cfg.liveness.intervall_sek, 30);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.liveness.schwelle, 2);
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");

        let laufzeit = cfg.signaling_config();
        assert_eq!(laufzeit.ws_pfad, "/chat");
        assert_eq!(laufzeit.liveness_intervall, Duration::from_secs(30));
        assert_eq!(laufzeit.registry.kulanzzeit, Duration::ZERO);
        assert_eq!(laufzeit.registry.kick_timeout, Duration::from_millis(100));
        assert_eq!(laufzeit.verbindung.schreib_frist, Duration::from_secs(5));
        assert_eq!(laufzeit.verbindung.lese_frist, Duration::from_secs(60));
    }

    #[test]
    fn ungueltige_werte_werden_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.logging.level = "laut".into();
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.netzwerk.ws_pfad = "ws".into();
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.liveness.schwelle = 0;
        assert!(cfg.validieren().is_err());

        // Lesefrist kuerzer als Keepalive trennt gesunde Verbindungen
        let mut cfg = ServerConfig::default();
        cfg.verbindung.lese_frist_sek = 30;
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn fehlende_datei_ergibt_standard() {
        let cfg = ServerConfig::laden("/gibt/es/nicht/plauder.toml").unwrap();
        assert_eq!(cfg.netzwerk.ws_port, 8080);
    }
}
