//! rundfunk-channel – Gruppen-Broadcast ueber Sessions
//!
//! Eine Nachricht wird pro Broadcast genau einmal kodiert; der fertige
//! Buffer wird danach von allen Sendevorgaengen gemeinsam gelesen.
//!
//! ## Ablauf
//!
//! ```text
//! Channel::broadcast
//!     |
//!     v
//! Broadcaster::broadcast
//!     +-- ProtocolState::write_to_buffer   (einmal)
//!     +-- Channel::fetch                   (Schnappschuss unter Lese-Sperre)
//!     +-- Session::async_send_buffer       (pro Mitglied, ohne Sperre)
//!     |
//!     v
//! Vec<BroadcastWork>  (ein Handle pro Empfaenger)
//! ```

pub mod broadcast;
pub mod channel;
pub mod error;

#[cfg(test)]
mod test_hilfen;

// Bequeme Re-Exporte
pub use broadcast::{BroadcastWork, Broadcaster};
pub use channel::{Channel, KickCallback};
pub use error::{BroadcastError, BroadcastResult};
