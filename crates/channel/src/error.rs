//! Fehlertypen fuer Broadcasts

use rundfunk_protocol::ProtocolError;
use thiserror::Error;

/// Fehler, der einen ganzen Broadcast scheitern laesst
///
/// Fehler einzelner Empfaenger stehen nur in deren `AsyncWork`.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// Nachricht konnte nicht kodiert werden, es wurde nichts gesendet
    #[error("Kodierung fehlgeschlagen: {0}")]
    Kodierung(#[from] ProtocolError),
}

/// Result-Typ fuer Broadcasts
pub type BroadcastResult<T> = Result<T, BroadcastError>;
