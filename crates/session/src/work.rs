//! Handle auf einen laufenden Sendevorgang
//!
//! `AsyncWork` ist ein Future, das genau einmal das Ergebnis eines
//! Sendevorgangs liefert. Die Session behaelt den passenden
//! `WorkCompleter` und meldet darueber Erfolg oder Fehler.
//!
//! Hat der Vorgang eine Frist, endet das Handle spaetestens dann mit
//! `Timeout`, auch wenn die Session noch gar nicht zum Senden kam.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::time::{Instant, Sleep};

use crate::error::{SessionError, SessionResult};

enum Zustand {
    Ausstehend(oneshot::Receiver<SessionResult<()>>),
    Fertig(Option<SessionResult<()>>),
}

/// Ausstehender (oder bereits abgeschlossener) Sendevorgang
pub struct AsyncWork {
    zustand: Zustand,
    frist: Option<Instant>,
    // Erst beim ersten Poll angelegt, dann laeuft sicher eine Runtime
    wecker: Option<Pin<Box<Sleep>>>,
}

/// Gegenstueck zu `AsyncWork` auf Seiten der Session
pub struct WorkCompleter {
    tx: oneshot::Sender<SessionResult<()>>,
}

impl AsyncWork {
    /// Erzeugt ein verbundenes Paar aus Completer und Handle
    pub fn paar() -> (WorkCompleter, AsyncWork) {
        Self::paar_mit_frist(None)
    }

    /// Wie [`AsyncWork::paar`], das Handle endet aber spaetestens bei
    /// `frist` mit `Timeout`
    pub fn paar_mit_frist(frist: Option<Instant>) -> (WorkCompleter, AsyncWork) {
        let (tx, rx) = oneshot::channel();
        (
            WorkCompleter { tx },
            AsyncWork {
                zustand: Zustand::Ausstehend(rx),
                frist,
                wecker: None,
            },
        )
    }

    /// Handle fuer einen Vorgang, dessen Ergebnis bereits feststeht
    pub fn fertig(ergebnis: SessionResult<()>) -> Self {
        Self {
            zustand: Zustand::Fertig(Some(ergebnis)),
            frist: None,
            wecker: None,
        }
    }

    fn abgelaufen(&self) -> bool {
        self.frist.is_some_and(|frist| Instant::now() >= frist)
    }

    /// Wartet auf das Ergebnis
    pub async fn wait(self) -> SessionResult<()> {
        self.await
    }

    /// Holt das Ergebnis ohne zu warten
    ///
    /// `None` solange der Vorgang laeuft. Das Ergebnis wird nur einmal
    /// herausgegeben, danach liefert `try_result` wieder `None`.
    pub fn try_result(&mut self) -> Option<SessionResult<()>> {
        let abgelaufen = self.abgelaufen();
        let ergebnis = match &mut self.zustand {
            Zustand::Fertig(ergebnis) => return ergebnis.take(),
            Zustand::Ausstehend(rx) => match rx.try_recv() {
                Ok(ergebnis) => ergebnis,
                Err(oneshot::error::TryRecvError::Empty) if abgelaufen => {
                    Err(SessionError::Timeout)
                }
                Err(oneshot::error::TryRecvError::Empty) => return None,
                Err(oneshot::error::TryRecvError::Closed) => Err(SessionError::Abgebrochen),
            },
        };
        self.zustand = Zustand::Fertig(None);
        Some(ergebnis)
    }
}

impl Future for AsyncWork {
    type Output = SessionResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let rx = match &mut this.zustand {
            Zustand::Fertig(ergebnis) => {
                return Poll::Ready(ergebnis.take().unwrap_or(Err(SessionError::Abgebrochen)));
            }
            Zustand::Ausstehend(rx) => rx,
        };

        let ergebnis = match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(ergebnis)) => ergebnis,
            // Completer ohne Ergebnis verworfen
            Poll::Ready(Err(_)) => Err(SessionError::Abgebrochen),
            Poll::Pending => {
                let Some(frist) = this.frist else {
                    return Poll::Pending;
                };
                let wecker = this
                    .wecker
                    .get_or_insert_with(|| Box::pin(tokio::time::sleep_until(frist)));
                match wecker.as_mut().poll(cx) {
                    Poll::Ready(()) => Err(SessionError::Timeout),
                    Poll::Pending => return Poll::Pending,
                }
            }
        };

        this.zustand = Zustand::Fertig(None);
        Poll::Ready(ergebnis)
    }
}

impl WorkCompleter {
    /// Meldet das Ergebnis; ein bereits verworfenes Handle wird ignoriert
    pub fn abschliessen(self, ergebnis: SessionResult<()>) {
        let _ = self.tx.send(ergebnis);
    }
}
