//! Fehlertypen fuer das Paket-Protokoll

use thiserror::Error;

/// Fehlertyp fuer Kodierung und Dekodierung von Paketen
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Nutzdaten uebersteigen die erlaubte Paketgroesse
    #[error("Paket zu gross: {groesse} Bytes (Maximum: {maximum} Bytes)")]
    PaketZuGross { groesse: usize, maximum: usize },

    /// Nachricht konnte nicht serialisiert werden
    #[error("Kodierung fehlgeschlagen: {0}")]
    Kodierung(String),

    /// IO-Fehler beim Lesen eines Pakets
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Erstellt einen Kodierungsfehler
    pub fn kodierung(msg: impl Into<String>) -> Self {
        Self::Kodierung(msg.into())
    }
}

/// Result-Typ fuer das Paket-Protokoll
pub type ProtocolResult<T> = Result<T, ProtocolError>;
