//! rundfunk-session – Sessions aus Sicht des Broadcast-Kerns
//!
//! Der Kern kennt eine Session nur ueber den `Session`-Trait:
//! Identitaet, asynchrones Senden mit Timeout und Close-Callbacks unter
//! einem Besitzer-Schluessel. Konkrete Implementierungen:
//!
//! ```text
//! Session (Trait)
//!     +-- TcpSession   (Schreib-Task pro Verbindung, Send-Queue)
//!     +-- MockSession  (Test-Double, zeichnet Buffer auf)
//! ```

pub mod callbacks;
pub mod error;
pub mod mock;
pub mod session;
pub mod tcp;
pub mod work;

// Bequeme Re-Exporte
pub use callbacks::{CloseCallback, CloseCallbacks};
pub use error::{SessionError, SessionResult};
pub use mock::MockSession;
pub use session::Session;
pub use tcp::{TcpSession, TcpSessionConfig};
pub use work::{AsyncWork, WorkCompleter};
