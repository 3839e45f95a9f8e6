//! Gemeinsame Identifikationstypen fuer Rundfunk
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Beide IDs werden
//! prozessweit aus atomaren Zaehlern vergeben und sind nie 0.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NAECHSTE_SESSION_ID: AtomicU64 = AtomicU64::new(1);
static NAECHSTER_OWNER_KEY: AtomicU64 = AtomicU64::new(1);

/// Eindeutige Session-ID (stabil solange die Session lebt)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Vergibt die naechste freie SessionId
    pub fn naechste() -> Self {
        Self(NAECHSTE_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Gibt den inneren Zahlenwert zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Schluessel unter dem ein Besitzer (z.B. ein Channel) Close-Callbacks
/// an einer Session registriert
///
/// Jeder Besitzer zieht genau einen Schluessel und entfernt seine
/// Registrierung spaeter ueber denselben Schluessel wieder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerKey(pub u64);

impl OwnerKey {
    /// Vergibt einen neuen, prozessweit eindeutigen Schluessel
    pub fn neu() -> Self {
        Self(NAECHSTER_OWNER_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "owner:{}", self.0)
    }
}

/// Seite einer Verbindung, fuer die ein Protokoll-Zustand erzeugt wird
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolSide {
    #[default]
    Server,
    Client,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_eindeutig() {
        let a = SessionId::naechste();
        let b = SessionId::naechste();
        assert_ne!(a, b, "Zwei neue SessionIds muessen verschieden sein");
        assert!(a.inner() > 0);
    }

    #[test]
    fn owner_keys_eindeutig() {
        assert_ne!(OwnerKey::neu(), OwnerKey::neu());
    }

    #[test]
    fn session_id_display() {
        assert_eq!(SessionId(7).to_string(), "session:7");
    }

    #[test]
    fn protocol_side_ist_serde_kompatibel() {
        let json = serde_json::to_string(&ProtocolSide::Client).unwrap();
        assert_eq!(json, "\"client\"");
        let side: ProtocolSide = serde_json::from_str(&json).unwrap();
        assert_eq!(side, ProtocolSide::Client);
    }
}
