//! rundfunk-server – Bibliotheks-Root
//!
//! Demo-Server fuer den Broadcast-Kern: jede Verbindung tritt dem
//! Server-Channel bei, empfangene Pakete werden an alle Mitglieder
//! weitergereicht, und in festen Abstaenden gibt es eine Durchsage an
//! alle Verbindungen und an den Channel.
//!
//! ```text
//! TcpListener ── accept ──> verbindung::verarbeiten
//!                              +-- SessionHub::registrieren
//!                              +-- Channel::join
//!                              +-- Paket lesen ──> Channel::broadcast
//!
//! Durchsagen (Intervall) ──> SessionHub::broadcast + Channel::broadcast
//! ```

pub mod config;
pub mod hub;
mod verbindung;

use config::ServerConfig;
use hub::SessionHub;
use rundfunk_channel::{BroadcastResult, BroadcastWork, Channel};
use rundfunk_core::{ProtocolSide, Result, RundfunkError};
use rundfunk_observability::RundfunkMetrics;
use rundfunk_protocol::{PacketProtocol, Text};
use rundfunk_session::Session;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// ServerZustand
// ---------------------------------------------------------------------------

/// Von allen Verbindungs-Tasks geteilter Zustand
pub struct ServerZustand {
    pub config: ServerConfig,
    /// Alle Verbindungen
    pub hub: SessionHub,
    /// Channel, dem jede Verbindung beitritt; Zustand ist der Channel-Name
    pub lobby: Channel<String>,
    pub metriken: RundfunkMetrics,
}

impl ServerZustand {
    /// Zaehlt einen Broadcast und wertet seine Sendevorgaenge im Hintergrund aus
    ///
    /// Muss innerhalb einer tokio-Runtime aufgerufen werden.
    pub fn verteilen(&self, ergebnis: BroadcastResult<Vec<BroadcastWork>>) {
        let works = match ergebnis {
            Ok(works) => works,
            Err(e) => {
                self.metriken.broadcast_encode_failures_total.inc();
                tracing::warn!(fehler = %e, "Broadcast verworfen");
                return;
            }
        };

        self.metriken.broadcasts_total.inc();
        self.metriken.broadcast_sends_total.inc_by(works.len() as u64);
        if works.is_empty() {
            return;
        }

        let fehlschlaege = self.metriken.broadcast_send_failures_total.clone();
        tokio::spawn(async move {
            for bw in works {
                let session_id = bw.session.id();
                if let Err(e) = bw.work.await {
                    fehlschlaege.inc();
                    tracing::debug!(
                        session_id = %session_id,
                        fehler = %e,
                        "Broadcast-Sendung fehlgeschlagen"
                    );
                }
            }
        });
    }

    fn gauges_aktualisieren(&self) {
        self.metriken.connected_sessions.set(self.hub.anzahl() as i64);
        self.metriken.channel_members.set(self.lobby.len() as i64);
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    zustand: Arc<ServerZustand>,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Result<Self> {
        let protocol = PacketProtocol::with_max_size(config.netzwerk.max_paket_groesse);
        let ungueltig = |e: rundfunk_protocol::ProtocolError| {
            RundfunkError::Konfiguration(format!("netzwerk.max_paket_groesse: {e}"))
        };
        let hub = SessionHub::neu(&protocol, ProtocolSide::Server).map_err(ungueltig)?;
        let lobby = Channel::mit_zustand(
            &protocol,
            ProtocolSide::Server,
            config.broadcast.channel_name.clone(),
        )
        .map_err(ungueltig)?;
        let metriken = RundfunkMetrics::neu()?;

        Ok(Self {
            zustand: Arc::new(ServerZustand {
                config,
                hub,
                lobby,
                metriken,
            }),
        })
    }

    pub fn zustand(&self) -> Arc<ServerZustand> {
        Arc::clone(&self.zustand)
    }

    /// Bindet den Listener und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let config = &self.zustand.config;
        let listener = TcpListener::bind(config.tcp_bind_adresse()).await?;

        if config.observability.aktiviert {
            let adresse = config.observability_bind_adresse().parse().map_err(|e| {
                RundfunkError::Konfiguration(format!("Observability-Adresse: {e}"))
            })?;
            let metriken = self.zustand.metriken.clone();
            tokio::spawn(async move {
                if let Err(e) =
                    rundfunk_observability::observability_server_starten(adresse, metriken).await
                {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            });
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler nicht verfuegbar"),
            }
            let _ = shutdown_tx.send(true);
        });

        self.ausfuehren(listener, shutdown_rx).await
    }

    /// Accept-Loop auf einem bereits gebundenen Listener
    ///
    /// Endet, sobald `shutdown_rx` auf `true` wechselt; offene Verbindungen
    /// werden dabei geschlossen.
    pub async fn ausfuehren(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        tracing::info!(
            adresse = %listener.local_addr()?,
            channel = %self.zustand.lobby.state(),
            "Rundfunk-Server gestartet"
        );

        let durchsagen_task = tokio::spawn(durchsagen(
            Arc::clone(&self.zustand),
            shutdown_rx.clone(),
        ));

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");
                            tokio::spawn(verbindung::verarbeiten(
                                Arc::clone(&self.zustand),
                                stream,
                                shutdown_rx.clone(),
                            ));
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }

                aenderung = shutdown_rx.changed() => {
                    if aenderung.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        durchsagen_task.abort();
        tracing::info!("Rundfunk-Server gestoppt");
        Ok(())
    }
}

/// Periodische Durchsage an alle Verbindungen und an den Channel
async fn durchsagen(zustand: Arc<ServerZustand>, mut shutdown_rx: watch::Receiver<bool>) {
    let sekunden = zustand.config.broadcast.intervall_sek;
    if sekunden == 0 {
        return;
    }
    let dauer = Duration::from_secs(sekunden);
    let timeout = zustand.config.send_timeout();
    let mut intervall = tokio::time::interval_at(tokio::time::Instant::now() + dauer, dauer);

    loop {
        tokio::select! {
            _ = intervall.tick() => {
                let jetzt = chrono::Local::now().to_rfc3339();
                zustand.verteilen(
                    zustand.hub.broadcast(&Text::neu(format!("server say: {jetzt}")), timeout),
                );
                zustand.verteilen(
                    zustand.lobby.broadcast(&Text::neu(format!("channel say: {jetzt}")), timeout),
                );
                zustand.gauges_aktualisieren();
            }
            aenderung = shutdown_rx.changed() => {
                if aenderung.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
