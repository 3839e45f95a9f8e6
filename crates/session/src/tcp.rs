//! TCP-Session – Sende-Seite einer einzelnen Verbindung
//!
//! Jede `TcpSession` besitzt einen eigenen Schreib-Task, der eingereihte
//! Buffer nacheinander auf den Socket schreibt. `async_send_buffer` reiht
//! nur ein (`try_send`) und kehrt sofort zurueck. Die Lese-Seite wird dem
//! Aufrufer als `FramedRead` mit `PacketCodec` uebergeben.
//!
//! ## Schliessen
//! - explizit ueber `schliessen()` (idempotent)
//! - implizit bei einem Schreibfehler oder Timeout mitten im Schreiben
//!
//! In beiden Faellen werden alle Close-Callbacks genau einmal ausgeloest,
//! ein laufender Schreibvorgang abgebrochen und noch eingereihte Buffer mit
//! `Geschlossen` beendet. Fristen laufen im `AsyncWork` selbst ab, auch
//! wenn der Schreib-Task noch an einem frueheren Buffer haengt.

use bytes::Bytes;
use rundfunk_core::{OwnerKey, SessionId};
use rundfunk_protocol::PacketCodec;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::codec::FramedRead;

use crate::callbacks::{CloseCallback, CloseCallbacks};
use crate::error::{SessionError, SessionResult};
use crate::session::Session;
use crate::work::{AsyncWork, WorkCompleter};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Einstellungen fuer neue TCP-Sessions
#[derive(Debug, Clone)]
pub struct TcpSessionConfig {
    /// Groesse der Send-Queue pro Session
    pub send_queue_groesse: usize,
    /// Maximale Groesse eingehender Pakete
    pub max_paket_groesse: usize,
}

impl Default for TcpSessionConfig {
    fn default() -> Self {
        Self {
            send_queue_groesse: 64,
            max_paket_groesse: rundfunk_protocol::wire::DEFAULT_MAX_PAKET_GROESSE,
        }
    }
}

/// Lese-Seite einer TCP-Session
pub type PaketLeser = FramedRead<OwnedReadHalf, PacketCodec>;

struct SendAuftrag {
    buffer: Bytes,
    deadline: Option<Instant>,
    completer: WorkCompleter,
}

// ---------------------------------------------------------------------------
// TcpSession
// ---------------------------------------------------------------------------

/// Session ueber eine TCP-Verbindung
pub struct TcpSession {
    id: SessionId,
    peer_addr: SocketAddr,
    send_tx: mpsc::Sender<SendAuftrag>,
    shutdown_tx: watch::Sender<bool>,
    callbacks: CloseCallbacks,
}

impl TcpSession {
    /// Startet eine Session auf `stream` und spawnt ihren Schreib-Task
    ///
    /// Muss innerhalb einer tokio-Runtime aufgerufen werden.
    pub fn starten(
        stream: TcpStream,
        config: &TcpSessionConfig,
    ) -> std::io::Result<(Arc<Self>, PaketLeser)> {
        let peer_addr = stream.peer_addr()?;
        let (leser, schreiber) = stream.into_split();
        let (send_tx, send_rx) = mpsc::channel(config.send_queue_groesse.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let session = Arc::new(Self {
            id: SessionId::naechste(),
            peer_addr,
            send_tx,
            shutdown_tx,
            callbacks: CloseCallbacks::neu(),
        });

        tokio::spawn(schreib_schleife(
            Arc::downgrade(&session),
            session.id,
            schreiber,
            send_rx,
            shutdown_rx,
        ));

        tracing::debug!(session_id = %session.id, peer = %peer_addr, "TCP-Session gestartet");

        let leser = FramedRead::new(leser, PacketCodec::with_max_size(config.max_paket_groesse));
        Ok((session, leser))
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Schliesst die Session und loest alle Close-Callbacks aus
    pub fn schliessen(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(anzahl) = self.callbacks.ausloesen() {
            tracing::debug!(
                session_id = %self.id,
                peer = %self.peer_addr,
                callbacks = anzahl,
                "TCP-Session geschlossen"
            );
        }
    }

    pub fn ist_geschlossen(&self) -> bool {
        self.callbacks.ist_geschlossen()
    }
}

impl Session for TcpSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn async_send_buffer(&self, buffer: Bytes, timeout: Duration) -> AsyncWork {
        if self.ist_geschlossen() {
            return AsyncWork::fertig(Err(SessionError::Geschlossen));
        }

        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
        let (completer, work) = AsyncWork::paar_mit_frist(deadline);
        let auftrag = SendAuftrag {
            buffer,
            deadline,
            completer,
        };

        match self.send_tx.try_send(auftrag) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(auftrag)) => {
                tracing::warn!(session_id = %self.id, "Send-Queue voll – Buffer verworfen");
                auftrag.completer.abschliessen(Err(SessionError::QueueVoll));
            }
            Err(mpsc::error::TrySendError::Closed(auftrag)) => {
                tracing::debug!(session_id = %self.id, "Send-Queue geschlossen");
                auftrag.completer.abschliessen(Err(SessionError::Geschlossen));
            }
        }
        work
    }

    fn add_close_callback(&self, owner: OwnerKey, callback: CloseCallback) {
        self.callbacks.hinzufuegen(owner, callback);
    }

    fn remove_close_callback(&self, owner: OwnerKey) {
        self.callbacks.entfernen(owner);
    }
}

// ---------------------------------------------------------------------------
// Schreib-Task
// ---------------------------------------------------------------------------

async fn schreib_schleife(
    session: Weak<TcpSession>,
    id: SessionId,
    mut schreiber: OwnedWriteHalf,
    mut send_rx: mpsc::Receiver<SendAuftrag>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            auftrag = send_rx.recv() => {
                let Some(auftrag) = auftrag else {
                    // Session verworfen
                    break;
                };

                if auftrag.deadline.is_some_and(|d| Instant::now() >= d) {
                    tracing::warn!(session_id = %id, "Buffer vor dem Senden abgelaufen");
                    auftrag.completer.abschliessen(Err(SessionError::Timeout));
                    continue;
                }

                let ergebnis = schreiben(
                    &mut schreiber,
                    &auftrag.buffer,
                    auftrag.deadline,
                    &mut shutdown_rx,
                )
                .await;
                let fehlgeschlagen = ergebnis.is_err();
                if let Err(ref e) = ergebnis {
                    tracing::warn!(session_id = %id, fehler = %e, "Senden fehlgeschlagen");
                }
                auftrag.completer.abschliessen(ergebnis);

                // Ein halb geschriebenes Paket macht den Stream unbrauchbar
                if fehlgeschlagen {
                    if let Some(session) = session.upgrade() {
                        session.schliessen();
                    }
                    break;
                }
            }

            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    send_rx.close();
    while let Ok(auftrag) = send_rx.try_recv() {
        auftrag.completer.abschliessen(Err(SessionError::Geschlossen));
    }
    let _ = schreiber.shutdown().await;

    tracing::trace!(session_id = %id, "Schreib-Task beendet");
}

/// Schreibt einen Buffer; bricht bei Frist-Ablauf oder `schliessen()` ab
async fn schreiben(
    schreiber: &mut OwnedWriteHalf,
    buffer: &[u8],
    deadline: Option<Instant>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> SessionResult<()> {
    let schreiben = async {
        match deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, schreiber.write_all(buffer)).await {
                    Ok(ergebnis) => ergebnis.map_err(SessionError::from),
                    Err(_) => Err(SessionError::Timeout),
                }
            }
            None => schreiber.write_all(buffer).await.map_err(SessionError::from),
        }
    };

    tokio::select! {
        ergebnis = schreiben => ergebnis,
        _ = geschlossen(shutdown_rx) => Err(SessionError::Geschlossen),
    }
}

/// Kehrt zurueck sobald die Session geschlossen wird
async fn geschlossen(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            // Session verworfen ohne zu schliessen: weiterschreiben
            std::future::pending::<()>().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn verbundenes_paar() -> (Arc<TcpSession>, PaketLeser, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server_stream, _) = listener.accept().await.unwrap();
        let (session, leser) =
            TcpSession::starten(server_stream, &TcpSessionConfig::default()).unwrap();
        (session, leser, client)
    }

    #[tokio::test]
    async fn buffer_kommt_beim_client_an() {
        let (session, _leser, mut client) = verbundenes_paar().await;

        let work = session.async_send_buffer(
            Bytes::from_static(b"\x00\x00\x00\x02hi"),
            Duration::ZERO,
        );
        work.wait().await.expect("Senden muss gelingen");

        let mut empfangen = [0u8; 6];
        client.read_exact(&mut empfangen).await.unwrap();
        assert_eq!(&empfangen, b"\x00\x00\x00\x02hi");
    }

    #[tokio::test]
    async fn leser_liefert_pakete_des_clients() {
        let (_session, mut leser, mut client) = verbundenes_paar().await;
        client.write_all(b"\x00\x00\x00\x03abc").await.unwrap();

        let paket = leser.next().await.unwrap().unwrap();
        assert_eq!(&paket[..], b"abc");
    }

    #[tokio::test]
    async fn schliessen_loest_callbacks_aus_und_sperrt_senden() {
        let (session, _leser, _client) = verbundenes_paar().await;
        let zaehler = Arc::new(AtomicUsize::new(0));
        let z = Arc::clone(&zaehler);
        session.add_close_callback(
            OwnerKey::neu(),
            Box::new(move || {
                z.fetch_add(1, Ordering::SeqCst);
            }),
        );

        session.schliessen();
        session.schliessen();
        assert_eq!(zaehler.load(Ordering::SeqCst), 1);
        assert!(session.ist_geschlossen());

        let ergebnis = session
            .async_send_buffer(Bytes::from_static(b"x"), Duration::ZERO)
            .wait()
            .await;
        assert!(matches!(ergebnis, Err(SessionError::Geschlossen)));
    }

    #[tokio::test]
    async fn entfernter_callback_bleibt_still() {
        let (session, _leser, _client) = verbundenes_paar().await;
        let zaehler = Arc::new(AtomicUsize::new(0));
        let z = Arc::clone(&zaehler);
        let owner = OwnerKey::neu();
        session.add_close_callback(
            owner,
            Box::new(move || {
                z.fetch_add(1, Ordering::SeqCst);
            }),
        );
        session.remove_close_callback(owner);

        session.schliessen();
        assert_eq!(zaehler.load(Ordering::SeqCst), 0);
    }

    /// Groesser als jeder Socket-Puffer; haengt, solange der Client nicht liest
    fn riesiger_buffer() -> Bytes {
        Bytes::from(vec![0u8; 64 * 1024 * 1024])
    }

    #[tokio::test]
    async fn frist_laeuft_hinter_haengendem_schreiben_ab() {
        let (session, _leser, _client) = verbundenes_paar().await;
        let haengend = session.async_send_buffer(riesiger_buffer(), Duration::ZERO);
        let mit_frist =
            session.async_send_buffer(Bytes::from_static(b"kurz"), Duration::from_millis(100));

        let ergebnis = tokio::time::timeout(Duration::from_secs(3), mit_frist)
            .await
            .expect("Frist muss das Handle beenden");
        assert!(matches!(ergebnis, Err(SessionError::Timeout)));

        session.schliessen();
        let ergebnis = tokio::time::timeout(Duration::from_secs(3), haengend)
            .await
            .expect("Schliessen muss den laufenden Vorgang beenden");
        assert!(matches!(ergebnis, Err(SessionError::Geschlossen)));
    }

    #[tokio::test]
    async fn schliessen_bricht_laufendes_schreiben_ab() {
        let (session, _leser, _client) = verbundenes_paar().await;
        let haengend = session.async_send_buffer(riesiger_buffer(), Duration::ZERO);
        let wartend = session.async_send_buffer(Bytes::from_static(b"danach"), Duration::ZERO);

        // Schreib-Task sicher im laufenden write_all
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.schliessen();

        for work in [haengend, wartend] {
            let ergebnis = tokio::time::timeout(Duration::from_secs(3), work)
                .await
                .expect("Schliessen muss jeden Vorgang beenden");
            assert!(matches!(ergebnis, Err(SessionError::Geschlossen)));
        }
    }

    #[tokio::test]
    async fn sessions_haben_verschiedene_ids() {
        let (a, _la, _ca) = verbundenes_paar().await;
        let (b, _lb, _cb) = verbundenes_paar().await;
        assert_ne!(a.id(), b.id());
    }
}
