//! SessionHub – alle Verbindungen des Servers
//!
//! Haelt jede registrierte Session bis zu ihrem Schliessen und bietet
//! einen Server-weiten Broadcast ueber denselben Broadcaster wie ein
//! Channel, nur mit der Verbindungsliste als Quelle.

use dashmap::DashMap;
use rundfunk_channel::{BroadcastResult, BroadcastWork, Broadcaster};
use rundfunk_core::{OwnerKey, ProtocolSide, SessionId};
use rundfunk_protocol::{Message, Protocol, ProtocolResult};
use rundfunk_session::Session;
use std::sync::{Arc, Weak};
use std::time::Duration;

type SessionMap = DashMap<SessionId, Arc<dyn Session>>;

/// Verbindungsliste mit Server-Broadcast
pub struct SessionHub {
    sessions: Arc<SessionMap>,
    owner: OwnerKey,
    broadcaster: Broadcaster,
}

impl SessionHub {
    pub fn neu<P: Protocol>(protocol: &P, side: ProtocolSide) -> ProtocolResult<Self> {
        let sessions: Arc<SessionMap> = Arc::new(DashMap::new());

        // Schnappschuss ziehen, damit keine Shard-Sperre waehrend des
        // Sendens gehalten wird
        let quelle = Arc::clone(&sessions);
        let broadcaster = Broadcaster::neu(
            protocol.new_state(side)?,
            move |callback: &mut dyn FnMut(Arc<dyn Session>)| {
                let schnappschuss: Vec<Arc<dyn Session>> =
                    quelle.iter().map(|e| Arc::clone(e.value())).collect();
                for session in schnappschuss {
                    callback(session);
                }
            },
        );

        Ok(Self {
            sessions,
            owner: OwnerKey::neu(),
            broadcaster,
        })
    }

    /// Nimmt eine Session auf; sie verlaesst den Hub beim Schliessen von selbst
    pub fn registrieren(&self, session: Arc<dyn Session>) {
        let id = session.id();
        self.sessions.insert(id, Arc::clone(&session));

        let sessions: Weak<SessionMap> = Arc::downgrade(&self.sessions);
        session.add_close_callback(
            self.owner,
            Box::new(move || {
                if let Some(sessions) = sessions.upgrade() {
                    sessions.remove(&id);
                    tracing::debug!(session_id = %id, "Session aus Hub entfernt");
                }
            }),
        );
    }

    /// Entfernt eine Session ohne sie zu schliessen
    pub fn entfernen(&self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some((_, session)) => {
                session.remove_close_callback(self.owner);
                true
            }
            None => false,
        }
    }

    pub fn anzahl(&self) -> usize {
        self.sessions.len()
    }

    pub fn enthaelt(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Sendet `message` an alle registrierten Sessions
    pub fn broadcast(
        &self,
        message: &dyn Message,
        timeout: Duration,
    ) -> BroadcastResult<Vec<BroadcastWork>> {
        self.broadcaster.broadcast(message, timeout)
    }
}

impl Drop for SessionHub {
    fn drop(&mut self) {
        let sessions: Vec<Arc<dyn Session>> =
            self.sessions.iter().map(|e| Arc::clone(e.value())).collect();
        self.sessions.clear();
        for session in sessions {
            session.remove_close_callback(self.owner);
        }
    }
}
