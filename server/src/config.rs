//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use rundfunk_core::{Result, RundfunkError};
use rundfunk_observability::logging::log_level_gueltig;
use rundfunk_session::TcpSessionConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Einstellungen pro Session
    pub session: SessionEinstellungen,
    /// Periodische Broadcasts
    pub broadcast: BroadcastEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken)
    pub observability: ObservabilityEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den TCP-Listener
    pub bind_adresse: String,
    /// Port fuer den TCP-Listener
    pub tcp_port: u16,
    /// Maximale Nutzdaten-Groesse eines Pakets in Bytes
    pub max_paket_groesse: usize,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "127.0.0.1".into(),
            tcp_port: 10010,
            max_paket_groesse: 1024 * 1024,
        }
    }
}

/// Einstellungen pro Session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEinstellungen {
    /// Laenge der Send-Queue; volle Queues verwerfen Buffer
    pub send_queue_groesse: usize,
    /// Zeitlimit pro Sendevorgang in Millisekunden (0 = keines)
    pub send_timeout_ms: u64,
}

impl Default for SessionEinstellungen {
    fn default() -> Self {
        Self {
            send_queue_groesse: 64,
            send_timeout_ms: 0,
        }
    }
}

/// Periodische Broadcasts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastEinstellungen {
    /// Abstand der Server- und Channel-Durchsagen in Sekunden (0 = aus)
    pub intervall_sek: u64,
    /// Name des Channels, dem jede neue Session beitritt
    pub channel_name: String,
}

impl Default for BroadcastEinstellungen {
    fn default() -> Self {
        Self {
            intervall_sek: 2,
            channel_name: "lobby".into(),
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

/// Observability-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den `/metrics`-Endpunkt
    pub aktiviert: bool,
    /// Port fuer Metriken
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: false,
            port: 9310,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self> {
        let mut config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt).map_err(|e| {
                RundfunkError::Konfiguration(format!("Fehler in '{pfad}': {e}"))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.validieren();
        Ok(config)
    }

    /// Ersetzt ungueltige Werte durch Standardwerte
    pub fn validieren(&mut self) {
        if !log_level_gueltig(&self.logging.level) {
            tracing::warn!(
                level = %self.logging.level,
                "Ungueltiges Log-Level, verwende 'info'"
            );
            self.logging.level = LoggingEinstellungen::default().level;
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.observability.port)
    }

    /// Zeitlimit pro Sendevorgang (`Duration::ZERO` = keines)
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.session.send_timeout_ms)
    }

    /// Einstellungen fuer neue TCP-Sessions
    pub fn tcp_session_config(&self) -> TcpSessionConfig {
        TcpSessionConfig {
            send_queue_groesse: self.session.send_queue_groesse,
            max_paket_groesse: self.netzwerk.max_paket_groesse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.netzwerk.tcp_port, 10010);
        assert_eq!(cfg.broadcast.intervall_sek, 2);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.send_timeout(), Duration::ZERO);
        assert!(!cfg.observability.aktiviert);
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.tcp_bind_adresse(), "127.0.0.1:10010");
        assert_eq!(cfg.observability_bind_adresse(), "127.0.0.1:9310");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [netzwerk]
            tcp_port = 12000
            max_paket_groesse = 4096

            [session]
            send_timeout_ms = 250
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.netzwerk.tcp_port, 12000);
        assert_eq!(cfg.send_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.tcp_session_config().max_paket_groesse, 4096);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.session.send_queue_groesse, 64);
        assert_eq!(cfg.broadcast.channel_name, "lobby");
    }

    #[test]
    fn fehlende_datei_ergibt_standardwerte() {
        let cfg = ServerConfig::laden("/nicht/vorhanden/rundfunk.toml").unwrap();
        assert_eq!(cfg.netzwerk.tcp_port, 10010);
    }

    #[test]
    fn ungueltiges_log_level_faellt_auf_info_zurueck() {
        let mut cfg: ServerConfig = toml::from_str("[logging]\nlevel = \"laut\"").unwrap();
        cfg.validieren();
        assert_eq!(cfg.logging.level, "info");

        let mut cfg: ServerConfig = toml::from_str("[logging]\nlevel = \"trace\"").unwrap();
        cfg.validieren();
        assert_eq!(cfg.logging.level, "trace");
    }

    #[test]
    fn laden_validiert_log_level() {
        let pfad = std::env::temp_dir().join(format!("rundfunk-level-{}.toml", std::process::id()));
        std::fs::write(&pfad, "[logging]\nlevel = \"verbose\"\n").unwrap();
        let cfg = ServerConfig::laden(pfad.to_str().unwrap());
        let _ = std::fs::remove_file(&pfad);
        assert_eq!(cfg.unwrap().logging.level, "info");
    }

    #[test]
    fn kaputte_datei_ist_ein_fehler() {
        let pfad = std::env::temp_dir().join(format!("rundfunk-test-{}.toml", std::process::id()));
        std::fs::write(&pfad, "[netzwerk\ntcp_port = ").unwrap();
        let ergebnis = ServerConfig::laden(pfad.to_str().unwrap());
        let _ = std::fs::remove_file(&pfad);
        assert!(matches!(ergebnis, Err(RundfunkError::Konfiguration(_))));
    }
}
