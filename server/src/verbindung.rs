//! Verarbeitung einer einzelnen Client-Verbindung

use futures_util::StreamExt;
use rundfunk_protocol::Text;
use rundfunk_session::TcpSession;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::ServerZustand;

/// Meldet die Verbindung an, reicht ihre Pakete an den Channel weiter und
/// schliesst die Session bei EOF, Lesefehler oder Shutdown
pub(crate) async fn verarbeiten(
    zustand: Arc<ServerZustand>,
    stream: TcpStream,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let (session, mut leser) =
        match TcpSession::starten(stream, &zustand.config.tcp_session_config()) {
            Ok(paar) => paar,
            Err(e) => {
                tracing::warn!(fehler = %e, "Session konnte nicht gestartet werden");
                return;
            }
        };
    let peer = session.peer_addr();

    zustand.hub.registrieren(session.clone());
    zustand.lobby.join(session.clone(), None);
    zustand.gauges_aktualisieren();
    tracing::info!(peer = %peer, channel = %zustand.lobby.state(), "Client verbunden");

    let timeout = zustand.config.send_timeout();
    loop {
        tokio::select! {
            paket = leser.next() => {
                match paket {
                    Some(Ok(daten)) => {
                        let text = String::from_utf8_lossy(&daten);
                        let nachricht = Text::neu(format!("client {peer} say: {text}"));
                        zustand.verteilen(zustand.lobby.broadcast(&nachricht, timeout));
                    }
                    Some(Err(e)) => {
                        tracing::warn!(peer = %peer, fehler = %e, "Lesefehler");
                        break;
                    }
                    None => break,
                }
            }

            aenderung = shutdown_rx.changed() => {
                if aenderung.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    // Close-Callbacks nehmen die Session aus Hub und Channel
    session.schliessen();
    zustand.gauges_aktualisieren();
    tracing::info!(peer = %peer, "Client getrennt");
}
