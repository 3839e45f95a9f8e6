//! Channel – Mitgliedschaftsverwaltung fuer Gruppen-Broadcasts
//!
//! Ein Channel haelt eine Menge von Sessions und einen eigenen
//! `Broadcaster`, dessen Fetcher die aktuellen Mitglieder liefert.
//!
//! ## Sperren
//! Eine einzige Lese-/Schreibsperre schuetzt die Mitglieder-Map:
//! - `join`, `exit`, `kick`: exklusiv
//! - `fetch`, `len`, Broadcast-Aufzaehlung: geteilt
//!
//! Die Sperre gilt fuer den Map-Zugriff und, bei `exit` und `kick`, fuer das
//! Abmelden des Close-Callbacks (Reihenfolge immer Channel vor Session).
//! Kick-Callbacks, Fetch-Callbacks, Kodierung und Senden laufen ohne Sperre;
//! Callbacks duerfen den Channel deshalb wieder benutzen.
//!
//! ## Lebenszyklus eines Mitglieds
//! ```text
//! abwesend --join--> Mitglied --exit/kick/Session geschlossen--> abwesend
//!                      |  ^
//!                      +--+ join (ersetzt Kick-Callback)
//! ```

use parking_lot::{Mutex, RwLock};
use rundfunk_core::{OwnerKey, ProtocolSide, SessionId};
use rundfunk_protocol::{Message, Protocol, ProtocolResult};
use rundfunk_session::Session;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::broadcast::{BroadcastWork, Broadcaster};
use crate::error::BroadcastResult;

/// Wird genau einmal aufgerufen, wenn das Mitglied gekickt wird
pub type KickCallback = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// Mitglieder
// ---------------------------------------------------------------------------

struct Mitgliedschaft {
    session: Arc<dyn Session>,
    // Mutex nur damit die Map `Sync` bleibt; gelesen wird nie geteilt
    kick_callback: Option<Mutex<KickCallback>>,
}

/// Geteilter Kern eines Channels
///
/// Close-Callbacks der Sessions halten nur einen `Weak`-Verweis hierauf.
struct Mitglieder {
    owner: OwnerKey,
    sessions: RwLock<HashMap<SessionId, Mitgliedschaft>>,
}

impl Mitglieder {
    fn entfernen(&self, id: SessionId) -> Option<Mitgliedschaft> {
        self.sessions.write().remove(&id)
    }

    fn schnappschuss(&self) -> Vec<Arc<dyn Session>> {
        self.sessions
            .read()
            .values()
            .map(|m| Arc::clone(&m.session))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Gruppe von Sessions mit gemeinsamem Broadcast
///
/// `T` ist ein beliebiger Zustand des Aufrufers; der Channel liest und
/// schreibt ihn nie. Zum Teilen zwischen Tasks in ein `Arc` legen.
pub struct Channel<T = ()> {
    mitglieder: Arc<Mitglieder>,
    broadcaster: Broadcaster,
    state: T,
}

impl Channel<()> {
    /// Erstellt einen leeren Channel ohne eigenen Zustand
    pub fn neu<P: Protocol>(protocol: &P, side: ProtocolSide) -> ProtocolResult<Self> {
        Self::mit_zustand(protocol, side, ())
    }
}

impl<T> Channel<T> {
    /// Erstellt einen leeren Channel mit Aufrufer-Zustand
    pub fn mit_zustand<P: Protocol>(
        protocol: &P,
        side: ProtocolSide,
        state: T,
    ) -> ProtocolResult<Self> {
        let mitglieder = Arc::new(Mitglieder {
            owner: OwnerKey::neu(),
            sessions: RwLock::new(HashMap::new()),
        });

        let quelle = Arc::clone(&mitglieder);
        let broadcaster = Broadcaster::neu(
            protocol.new_state(side)?,
            move |callback: &mut dyn FnMut(Arc<dyn Session>)| {
                for session in quelle.schnappschuss() {
                    callback(session);
                }
            },
        );

        tracing::debug!(owner = %mitglieder.owner, "Channel erstellt");
        Ok(Self {
            mitglieder,
            broadcaster,
            state,
        })
    }

    /// Sendet `message` an alle Mitglieder; kodiert wird nur einmal
    pub fn broadcast(
        &self,
        message: &dyn Message,
        timeout: Duration,
    ) -> BroadcastResult<Vec<BroadcastWork>> {
        self.broadcaster.broadcast(message, timeout)
    }

    /// Anzahl der Mitglieder
    pub fn len(&self) -> usize {
        self.mitglieder.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nimmt `session` auf
    ///
    /// Ist die Session schon Mitglied, wird nur der Kick-Callback ersetzt.
    /// Wird die Session geschlossen, verlaesst sie den Channel automatisch.
    pub fn join(&self, session: Arc<dyn Session>, kick_callback: Option<KickCallback>) {
        let id = session.id();
        let (ersetzt, anzahl) = {
            let mut sessions = self.mitglieder.sessions.write();
            let alt = sessions.insert(
                id,
                Mitgliedschaft {
                    session: Arc::clone(&session),
                    kick_callback: kick_callback.map(Mutex::new),
                },
            );
            (alt, sessions.len())
        };

        // Erst nach dem Einfuegen registrieren: ist die Session bereits
        // geschlossen, laeuft der Callback sofort und raeumt wieder ab.
        let mitglieder: Weak<Mitglieder> = Arc::downgrade(&self.mitglieder);
        session.add_close_callback(
            self.mitglieder.owner,
            Box::new(move || {
                if let Some(mitglieder) = mitglieder.upgrade() {
                    if mitglieder.entfernen(id).is_some() {
                        tracing::debug!(
                            session_id = %id,
                            owner = %mitglieder.owner,
                            "Geschlossene Session hat Channel verlassen"
                        );
                    }
                }
            }),
        );

        tracing::debug!(
            session_id = %id,
            owner = %self.mitglieder.owner,
            erneut = ersetzt.is_some(),
            mitglieder = anzahl,
            "Session Channel beigetreten"
        );
    }

    /// Entfernt `session`; ohne Wirkung wenn sie kein Mitglied ist
    pub fn exit(&self, session: &dyn Session) {
        let entfernt = {
            let mut sessions = self.mitglieder.sessions.write();
            session.remove_close_callback(self.mitglieder.owner);
            sessions.remove(&session.id())
        };
        if entfernt.is_some() {
            tracing::debug!(
                session_id = %session.id(),
                owner = %self.mitglieder.owner,
                "Session hat Channel verlassen"
            );
        }
    }

    /// Wirft die Session `session_id` hinaus und ruft ihren Kick-Callback
    ///
    /// Der Callback laeuft synchron vor der Rueckkehr, aber ohne Sperre.
    /// Ohne Wirkung wenn die Session kein Mitglied ist.
    pub fn kick(&self, session_id: SessionId) {
        let mitgliedschaft = {
            let mut sessions = self.mitglieder.sessions.write();
            let Some(mitgliedschaft) = sessions.remove(&session_id) else {
                return;
            };
            // Unter der Sperre: ein paralleles join registriert seinen
            // Callback erst danach und behaelt ihn
            mitgliedschaft
                .session
                .remove_close_callback(self.mitglieder.owner);
            mitgliedschaft
        };

        tracing::debug!(
            session_id = %session_id,
            owner = %self.mitglieder.owner,
            "Session aus Channel gekickt"
        );

        if let Some(kick_callback) = mitgliedschaft.kick_callback {
            (kick_callback.into_inner())();
        }
    }

    /// Ruft `callback` fuer jedes Mitglied einmal auf
    ///
    /// Arbeitet auf einem Schnappschuss; Aenderungen waehrend der
    /// Aufzaehlung wirken erst beim naechsten Aufruf. Reihenfolge beliebig.
    pub fn fetch<F>(&self, mut callback: F)
    where
        F: FnMut(Arc<dyn Session>),
    {
        for session in self.mitglieder.schnappschuss() {
            callback(session);
        }
    }

    /// Prueft ob `session_id` Mitglied ist
    pub fn ist_mitglied(&self, session_id: SessionId) -> bool {
        self.mitglieder.sessions.read().contains_key(&session_id)
    }

    /// Schluessel unter dem der Channel seine Close-Callbacks registriert
    pub fn owner_key(&self) -> OwnerKey {
        self.mitglieder.owner
    }

    pub fn state(&self) -> &T {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut T {
        &mut self.state
    }
}

impl<T> Drop for Channel<T> {
    fn drop(&mut self) {
        // Registrierungen an noch lebenden Sessions abraeumen
        let sessions = std::mem::take(&mut *self.mitglieder.sessions.write());
        for (_, mitgliedschaft) in sessions {
            mitgliedschaft
                .session
                .remove_close_callback(self.mitglieder.owner);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
