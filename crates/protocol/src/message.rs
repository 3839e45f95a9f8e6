//! Nachrichtentypen
//!
//! Eine `Message` schreibt nur ihre Nutzdaten; die Rahmung (Laengen-Feld)
//! uebernimmt der jeweilige `ProtocolState`.

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::OutBuffer;
use crate::error::{ProtocolError, ProtocolResult};

/// Eine Nachricht, die sich selbst in einen Buffer schreiben kann
pub trait Message: Send + Sync {
    /// Erwartete Nutzdaten-Groesse, dient nur zur Vorbelegung
    fn empfohlene_groesse(&self) -> usize {
        0
    }

    /// Schreibt die Nutzdaten an das Ende des Buffers
    fn in_buffer_schreiben(&self, buffer: &mut OutBuffer) -> ProtocolResult<()>;
}

/// UTF-8 Textnachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text(pub String);

impl Text {
    pub fn neu(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl Message for Text {
    fn empfohlene_groesse(&self) -> usize {
        self.0.len()
    }

    fn in_buffer_schreiben(&self, buffer: &mut OutBuffer) -> ProtocolResult<()> {
        buffer.put_slice(self.0.as_bytes());
        Ok(())
    }
}

/// Bereits fertige Nutzdaten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roh(pub Bytes);

impl Message for Roh {
    fn empfohlene_groesse(&self) -> usize {
        self.0.len()
    }

    fn in_buffer_schreiben(&self, buffer: &mut OutBuffer) -> ProtocolResult<()> {
        buffer.put_slice(&self.0);
        Ok(())
    }
}

/// JSON-kodierte Nachricht
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T> Message for Json<T>
where
    T: Serialize + Send + Sync,
{
    fn in_buffer_schreiben(&self, buffer: &mut OutBuffer) -> ProtocolResult<()> {
        let json = serde_json::to_vec(&self.0).map_err(|e| {
            ProtocolError::kodierung(format!("JSON-Serialisierung fehlgeschlagen: {}", e))
        })?;
        buffer.put_slice(&json);
        Ok(())
    }
}
