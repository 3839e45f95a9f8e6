//! Broadcaster – Einmal kodieren, an viele Sessions senden
//!
//! Der Broadcaster kennt keine Mitglieder. Er bekommt beim Erstellen eine
//! Aufzaehlungs-Funktion (`fetcher`), die bei jedem Broadcast alle aktuell
//! sichtbaren Sessions liefert: beim Channel dessen `fetch`, beim Server
//! die Liste aller Verbindungen.

use rundfunk_protocol::{Message, OutBuffer, ProtocolState};
use rundfunk_session::{AsyncWork, Session};
use std::sync::Arc;
use std::time::Duration;

use crate::error::BroadcastResult;

/// Aufzaehlung der Empfaenger
///
/// Muss den Callback synchron fuer jede sichtbare Session genau einmal
/// aufrufen, bevor sie zurueckkehrt.
pub type Fetcher = Arc<dyn Fn(&mut dyn FnMut(Arc<dyn Session>)) + Send + Sync>;

/// Startkapazitaet der Ergebnisliste
const WORKS_STARTKAPAZITAET: usize = 10;

// ---------------------------------------------------------------------------
// BroadcastWork
// ---------------------------------------------------------------------------

/// Ein Empfaenger und sein laufender Sendevorgang
pub struct BroadcastWork {
    pub session: Arc<dyn Session>,
    pub work: AsyncWork,
}

impl std::fmt::Debug for BroadcastWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastWork")
            .field("session_id", &self.session.id())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Broadcaster
// ---------------------------------------------------------------------------

/// Kodiert eine Nachricht einmal und verteilt den Buffer an alle Sessions
/// des Fetchers
///
/// Clone teilt Protokoll-Zustand und Fetcher.
#[derive(Clone)]
pub struct Broadcaster {
    protocol: Arc<dyn ProtocolState>,
    fetcher: Fetcher,
}

impl Broadcaster {
    /// Erstellt einen Broadcaster ueber einem Protokoll-Zustand und einer
    /// Session-Quelle
    pub fn neu<P, F>(protocol: P, fetcher: F) -> Self
    where
        P: ProtocolState + 'static,
        F: Fn(&mut dyn FnMut(Arc<dyn Session>)) + Send + Sync + 'static,
    {
        Self {
            protocol: Arc::new(protocol),
            fetcher: Arc::new(fetcher),
        }
    }

    /// Sendet `message` an alle Sessions, die der Fetcher jetzt liefert
    ///
    /// Gibt pro Empfaenger ein `BroadcastWork` zurueck. Schlaegt nur fehl,
    /// wenn die Nachricht nicht kodiert werden kann; dann wurde an niemanden
    /// gesendet. `timeout` gilt pro Sendevorgang, `Duration::ZERO` heisst
    /// ohne Zeitlimit.
    pub fn broadcast(
        &self,
        message: &dyn Message,
        timeout: Duration,
    ) -> BroadcastResult<Vec<BroadcastWork>> {
        let mut buffer = OutBuffer::mit_kapazitaet(message.empfohlene_groesse());
        if let Err(e) = self.protocol.write_to_buffer(&mut buffer, message) {
            tracing::warn!(fehler = %e, "Broadcast-Nachricht nicht kodierbar");
            return Err(e.into());
        }
        // Ab hier unveraenderlich, jede Session haelt eine eigene Referenz
        let buffer = buffer.einfrieren();

        let mut works = Vec::with_capacity(WORKS_STARTKAPAZITAET);
        (self.fetcher)(&mut |session: Arc<dyn Session>| {
            tracing::trace!(session_id = %session.id(), "Broadcast an Session");
            let work = session.async_send_buffer(buffer.clone(), timeout);
            works.push(BroadcastWork { session, work });
        });

        tracing::debug!(
            empfaenger = works.len(),
            bytes = buffer.len(),
            "Broadcast verteilt"
        );
        Ok(works)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
