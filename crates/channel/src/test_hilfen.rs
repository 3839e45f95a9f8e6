//! Gemeinsame Test-Hilfen

use rundfunk_core::ProtocolSide;
use rundfunk_protocol::{
    Message, OutBuffer, Protocol, ProtocolError, ProtocolResult, ProtocolState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Protokoll-Zustand, der seine Kodier-Aufrufe zaehlt
pub struct ZaehlState {
    aufrufe: Arc<AtomicUsize>,
    fehlschlagen: bool,
}

impl ZaehlState {
    pub fn neu(fehlschlagen: bool) -> Self {
        Self {
            aufrufe: Arc::new(AtomicUsize::new(0)),
            fehlschlagen,
        }
    }

    pub fn aufrufe(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.aufrufe)
    }
}

impl ProtocolState for ZaehlState {
    fn write_to_buffer(&self, buffer: &mut OutBuffer, message: &dyn Message) -> ProtocolResult<()> {
        self.aufrufe.fetch_add(1, Ordering::SeqCst);
        if self.fehlschlagen {
            return Err(ProtocolError::kodierung("absichtlich fehlgeschlagen"));
        }
        message.in_buffer_schreiben(buffer)
    }
}

/// Protokoll, dessen Zustaende in denselben Zaehler schreiben
pub struct ZaehlProtokoll {
    pub aufrufe: Arc<AtomicUsize>,
    pub fehlschlagen: bool,
}

impl ZaehlProtokoll {
    pub fn neu(fehlschlagen: bool) -> Self {
        Self {
            aufrufe: Arc::new(AtomicUsize::new(0)),
            fehlschlagen,
        }
    }
}

impl Protocol for ZaehlProtokoll {
    type State = ZaehlState;

    fn new_state(&self, _side: ProtocolSide) -> ProtocolResult<ZaehlState> {
        Ok(ZaehlState {
            aufrufe: Arc::clone(&self.aufrufe),
            fehlschlagen: self.fehlschlagen,
        })
    }
}
