//! Close-Callback-Registry
//!
//! Zuordnung Besitzer-Schluessel -> Callback. Die Session besitzt die
//! Callbacks, nicht die Besitzer; ein Channel referenziert sich darin nur
//! schwach. Callbacks laufen immer ausserhalb der Registry-Sperre, damit
//! sie selbst wieder `entfernen`/`hinzufuegen` aufrufen duerfen.

use parking_lot::Mutex;
use rundfunk_core::OwnerKey;
use std::collections::HashMap;

/// Callback der beim Schliessen einer Session ausgeloest wird
pub type CloseCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Registry {
    geschlossen: bool,
    callbacks: HashMap<OwnerKey, CloseCallback>,
}

/// Thread-safe Registry fuer Close-Callbacks einer Session
#[derive(Default)]
pub struct CloseCallbacks {
    inner: Mutex<Registry>,
}

impl CloseCallbacks {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert (oder ersetzt) den Callback fuer `owner`
    ///
    /// Nach `ausloesen` wird der Callback direkt aufgerufen statt gespeichert.
    pub fn hinzufuegen(&self, owner: OwnerKey, callback: CloseCallback) {
        let sofort = {
            let mut reg = self.inner.lock();
            if reg.geschlossen {
                Some(callback)
            } else {
                reg.callbacks.insert(owner, callback);
                None
            }
        };

        if let Some(callback) = sofort {
            tracing::debug!(
                owner = %owner,
                "Session bereits geschlossen, Callback sofort ausgeloest"
            );
            callback();
        }
    }

    /// Entfernt den Callback fuer `owner`; gibt `true` zurueck wenn einer existierte
    pub fn entfernen(&self, owner: OwnerKey) -> bool {
        self.inner.lock().callbacks.remove(&owner).is_some()
    }

    /// Markiert die Registry als geschlossen und ruft alle Callbacks auf
    ///
    /// Gibt beim ersten Aufruf die Anzahl der ausgeloesten Callbacks zurueck,
    /// bei jedem weiteren Aufruf `None`.
    pub fn ausloesen(&self) -> Option<usize> {
        let callbacks = {
            let mut reg = self.inner.lock();
            if reg.geschlossen {
                return None;
            }
            reg.geschlossen = true;
            std::mem::take(&mut reg.callbacks)
        };

        let anzahl = callbacks.len();
        for (_, callback) in callbacks {
            callback();
        }
        Some(anzahl)
    }

    pub fn ist_geschlossen(&self) -> bool {
        self.inner.lock().geschlossen
    }

    /// Anzahl der aktuell registrierten Callbacks
    pub fn anzahl(&self) -> usize {
        self.inner.lock().callbacks.len()
    }
}
