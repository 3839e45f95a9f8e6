//! Protokoll-Schnittstellen
//!
//! Ein `Protocol` ist die Fabrik, ein `ProtocolState` der Kodier-Kontext
//! fuer einen Besitzer (Channel, Session-Hub, Verbindung). Der Broadcast-Kern
//! kennt nur diese beiden Traits.

use rundfunk_core::ProtocolSide;
use std::sync::Arc;

use crate::buffer::OutBuffer;
use crate::error::ProtocolResult;
use crate::message::Message;

/// Erzeugt Kodier-Kontexte fuer eine Verbindungsseite
pub trait Protocol: Send + Sync {
    type State: ProtocolState + 'static;

    fn new_state(&self, side: ProtocolSide) -> ProtocolResult<Self::State>;
}

/// Kodiert Nachrichten in ausgehende Buffer
///
/// Implementierungen muessen fuer verschiedene Buffer nebenlaeufig
/// aufrufbar sein; der Broadcaster serialisiert seine Aufrufe nicht.
pub trait ProtocolState: Send + Sync {
    /// Schreibt `message` als vollstaendiges Paket an das Ende von `buffer`
    ///
    /// Im Fehlerfall bleibt der Buffer unveraendert.
    fn write_to_buffer(&self, buffer: &mut OutBuffer, message: &dyn Message) -> ProtocolResult<()>;
}

impl<T: ProtocolState + ?Sized> ProtocolState for Arc<T> {
    fn write_to_buffer(&self, buffer: &mut OutBuffer, message: &dyn Message) -> ProtocolResult<()> {
        (**self).write_to_buffer(buffer, message)
    }
}
