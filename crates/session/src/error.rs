//! Fehlertypen fuer Sessions

use thiserror::Error;

/// Fehler eines einzelnen Sendevorgangs
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session ist (oder wurde waehrend des Sendens) geschlossen
    #[error("Session geschlossen")]
    Geschlossen,

    /// Sendevorgang hat sein Zeitlimit ueberschritten
    #[error("Timeout")]
    Timeout,

    /// Send-Queue voll, Buffer verworfen
    #[error("Send-Queue voll")]
    QueueVoll,

    /// Sendevorgang wurde verworfen ohne ein Ergebnis zu melden
    #[error("Sendevorgang abgebrochen")]
    Abgebrochen,

    /// IO-Fehler beim Schreiben
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

/// Result-Typ fuer Sessions
pub type SessionResult<T> = Result<T, SessionError>;
