//! rundfunk-protocol – Paket-Protokoll und Nachrichtentypen
//!
//! Definiert die Schnittstelle zwischen Broadcast-Kern und Wire-Format:
//! eine `Message` schreibt ihre Nutzdaten in einen `OutBuffer`, ein
//! `ProtocolState` rahmt sie zu einem vollstaendigen Paket.

pub mod buffer;
pub mod error;
pub mod message;
pub mod protocol;
pub mod wire;

pub use buffer::OutBuffer;
pub use error::{ProtocolError, ProtocolResult};
pub use message::{Json, Message, Roh, Text};
pub use protocol::{Protocol, ProtocolState};
pub use wire::{PacketCodec, PacketProtocol, PacketState};
