//! Test-Double fuer den `Session`-Trait
//!
//! Zeichnet jeden empfangenen Buffer auf, kann Fehlschlaege simulieren und
//! das Schliessen einer Verbindung nachstellen. Keine Netzwerk-Anbindung.

use bytes::Bytes;
use parking_lot::Mutex;
use rundfunk_core::{OwnerKey, SessionId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::callbacks::{CloseCallback, CloseCallbacks};
use crate::error::SessionError;
use crate::session::Session;
use crate::work::AsyncWork;

/// Session ohne Verbindung, fuer Tests
pub struct MockSession {
    id: SessionId,
    empfangen: Mutex<Vec<Bytes>>,
    fehlschlagen: AtomicBool,
    callbacks: CloseCallbacks,
}

impl MockSession {
    /// Erstellt eine Mock-Session mit neuer ID
    pub fn neu() -> Arc<Self> {
        Self::mit_id(SessionId::naechste())
    }

    /// Erstellt eine Mock-Session mit fester ID
    pub fn mit_id(id: SessionId) -> Arc<Self> {
        Arc::new(Self {
            id,
            empfangen: Mutex::new(Vec::new()),
            fehlschlagen: AtomicBool::new(false),
            callbacks: CloseCallbacks::neu(),
        })
    }

    /// Alle bisher erfolgreich "gesendeten" Buffer
    pub fn empfangen(&self) -> Vec<Bytes> {
        self.empfangen.lock().clone()
    }

    pub fn sendungen(&self) -> usize {
        self.empfangen.lock().len()
    }

    /// Laesst alle folgenden Sendevorgaenge mit einem IO-Fehler scheitern
    pub fn senden_fehlschlagen_lassen(&self, fehlschlagen: bool) {
        self.fehlschlagen.store(fehlschlagen, Ordering::SeqCst);
    }

    /// Simuliert das Schliessen der Verbindung
    pub fn schliessen(&self) {
        self.callbacks.ausloesen();
    }

    pub fn ist_geschlossen(&self) -> bool {
        self.callbacks.ist_geschlossen()
    }

    /// Anzahl der registrierten Close-Callbacks
    pub fn close_callbacks(&self) -> usize {
        self.callbacks.anzahl()
    }
}

impl Session for MockSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn async_send_buffer(&self, buffer: Bytes, _timeout: Duration) -> AsyncWork {
        if self.ist_geschlossen() {
            return AsyncWork::fertig(Err(SessionError::Geschlossen));
        }
        if self.fehlschlagen.load(Ordering::SeqCst) {
            return AsyncWork::fertig(Err(SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "simulierter Sendefehler",
            ))));
        }
        self.empfangen.lock().push(buffer);
        AsyncWork::fertig(Ok(()))
    }

    fn add_close_callback(&self, owner: OwnerKey, callback: CloseCallback) {
        self.callbacks.hinzufuegen(owner, callback);
    }

    fn remove_close_callback(&self, owner: OwnerKey) {
        self.callbacks.entfernen(owner);
    }
}
