//! Der Session-Trait

use bytes::Bytes;
use rundfunk_core::{OwnerKey, SessionId};
use std::time::Duration;

use crate::callbacks::CloseCallback;
use crate::work::AsyncWork;

/// Faehigkeiten einer Session, die der Broadcast-Kern benoetigt
pub trait Session: Send + Sync + 'static {
    /// Stabile, fuer die Lebensdauer der Session eindeutige ID
    fn id(&self) -> SessionId;

    /// Stellt einen fertig kodierten Buffer zum Senden ein
    ///
    /// Blockiert nie. `timeout` begrenzt, wie lange der Sendevorgang
    /// ausstehen darf; `Duration::ZERO` bedeutet kein Zeitlimit. Der Buffer
    /// wird nur gelesen.
    fn async_send_buffer(&self, buffer: Bytes, timeout: Duration) -> AsyncWork;

    /// Registriert einen Callback, der beim Schliessen der Session genau
    /// einmal aufgerufen wird
    ///
    /// Ein bereits unter `owner` registrierter Callback wird ersetzt. Ist
    /// die Session schon geschlossen, wird der Callback sofort aufgerufen.
    fn add_close_callback(&self, owner: OwnerKey, callback: CloseCallback);

    /// Entfernt den unter `owner` registrierten Callback (falls vorhanden)
    ///
    /// Ein Channel ruft das unter seiner Schreibsperre auf; die
    /// Implementierung darf daher keine Callbacks ausloesen.
    fn remove_close_callback(&self, owner: OwnerKey);
}
