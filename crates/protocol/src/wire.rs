//! Wire-Format fuer TCP-Verbindungen
//!
//! Paket-basiertes Protokoll: Laenge (u32 big-endian) + Nutzdaten.
//!
//! ## Paket-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Nutzdaten  |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Nutzdaten-Bytes an (ohne die 4 Laengen-Bytes).
//! Maximale Paketgroesse ist konfigurierbar (Standard: 1 MB).

use bytes::{Buf, BufMut, BytesMut};
use rundfunk_core::ProtocolSide;
use tokio_util::codec::Decoder;

use crate::buffer::OutBuffer;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::Message;
use crate::protocol::{Protocol, ProtocolState};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Paketgroesse (1 MB)
pub const DEFAULT_MAX_PAKET_GROESSE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LAENGEN_FELD_GROESSE: usize = 4;

// ---------------------------------------------------------------------------
// PacketProtocol
// ---------------------------------------------------------------------------

/// Laengen-praefixiertes Paket-Protokoll
#[derive(Debug, Clone, Copy)]
pub struct PacketProtocol {
    max_paket_groesse: usize,
}

impl PacketProtocol {
    /// Erstellt das Protokoll mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_paket_groesse: DEFAULT_MAX_PAKET_GROESSE,
        }
    }

    /// Erstellt das Protokoll mit benutzerdefinierter maximaler Paketgroesse
    pub fn with_max_size(max_paket_groesse: usize) -> Self {
        Self { max_paket_groesse }
    }

    pub fn max_paket_groesse(&self) -> usize {
        self.max_paket_groesse
    }

    /// Passender Decoder fuer die Lese-Seite
    pub fn codec(&self) -> PacketCodec {
        PacketCodec::with_max_size(self.max_paket_groesse)
    }
}

impl Default for PacketProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol for PacketProtocol {
    type State = PacketState;

    fn new_state(&self, _side: ProtocolSide) -> ProtocolResult<PacketState> {
        if self.max_paket_groesse > u32::MAX as usize {
            return Err(ProtocolError::kodierung(format!(
                "Maximale Paketgroesse {} passt nicht in das Laengen-Feld",
                self.max_paket_groesse
            )));
        }
        Ok(PacketState {
            max_paket_groesse: self.max_paket_groesse,
        })
    }
}

// ---------------------------------------------------------------------------
// PacketState
// ---------------------------------------------------------------------------

/// Kodier-Kontext des Paket-Protokolls
///
/// Zustandslos bis auf die Limits, daher beliebig nebenlaeufig nutzbar.
#[derive(Debug, Clone)]
pub struct PacketState {
    max_paket_groesse: usize,
}

impl ProtocolState for PacketState {
    fn write_to_buffer(&self, buffer: &mut OutBuffer, message: &dyn Message) -> ProtocolResult<()> {
        let start = buffer.len();
        buffer.reservieren(LAENGEN_FELD_GROESSE + message.empfohlene_groesse());
        // Platzhalter fuer das Laengen-Feld, wird unten nachgetragen
        buffer.daten_mut().put_bytes(0, LAENGEN_FELD_GROESSE);

        if let Err(e) = message.in_buffer_schreiben(buffer) {
            buffer.kuerzen(start);
            return Err(e);
        }

        let nutzdaten = buffer.len() - start - LAENGEN_FELD_GROESSE;
        if nutzdaten > self.max_paket_groesse {
            buffer.kuerzen(start);
            return Err(ProtocolError::PaketZuGross {
                groesse: nutzdaten,
                maximum: self.max_paket_groesse,
            });
        }

        buffer.daten_mut()[start..start + LAENGEN_FELD_GROESSE]
            .copy_from_slice(&(nutzdaten as u32).to_be_bytes());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PacketCodec (Lese-Seite)
// ---------------------------------------------------------------------------

/// tokio-util Decoder fuer paket-basierte TCP-Verbindungen
///
/// Liefert die Nutzdaten eines Pakets ohne Laengen-Feld.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    max_paket_groesse: usize,
}

impl PacketCodec {
    pub fn new() -> Self {
        Self {
            max_paket_groesse: DEFAULT_MAX_PAKET_GROESSE,
        }
    }

    pub fn with_max_size(max_paket_groesse: usize) -> Self {
        Self { max_paket_groesse }
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PacketCodec {
    type Item = BytesMut;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LAENGEN_FELD_GROESSE {
            return Ok(None);
        }

        // Laenge lesen ohne den Buffer zu veraendern
        let laenge = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if laenge > self.max_paket_groesse {
            return Err(ProtocolError::PaketZuGross {
                groesse: laenge,
                maximum: self.max_paket_groesse,
            });
        }

        let gesamt = LAENGEN_FELD_GROESSE + laenge;
        if src.len() < gesamt {
            // Speicher vorbelegen um Reallocations zu vermeiden
            src.reserve(gesamt - src.len());
            return Ok(None);
        }

        src.advance(LAENGEN_FELD_GROESSE);
        Ok(Some(src.split_to(laenge)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Json, Text};
    use serde::Serialize;

    fn state(max: usize) -> PacketState {
        PacketProtocol::with_max_size(max)
            .new_state(ProtocolSide::Server)
            .unwrap()
    }

    #[test]
    fn text_paket_hat_laengen_praefix() {
        let mut buffer = OutBuffer::neu();
        state(1024)
            .write_to_buffer(&mut buffer, &Text::neu("hallo"))
            .unwrap();
        assert_eq!(buffer.as_slice(), b"\x00\x00\x00\x05hallo");
    }

    #[test]
    fn zu_grosses_paket_laesst_buffer_unveraendert() {
        let mut buffer = OutBuffer::neu();
        buffer.put_slice(b"vorher");

        let err = state(4)
            .write_to_buffer(&mut buffer, &Text::neu("zu lang"))
            .unwrap_err();

        assert!(matches!(
            err,
            ProtocolError::PaketZuGross { groesse: 7, maximum: 4 }
        ));
        assert_eq!(buffer.as_slice(), b"vorher");
    }

    #[test]
    fn leere_nachricht_ergibt_nur_header() {
        let mut buffer = OutBuffer::neu();
        state(16).write_to_buffer(&mut buffer, &Text::neu("")).unwrap();
        assert_eq!(buffer.as_slice(), &[0, 0, 0, 0]);
    }

    #[test]
    fn json_paket_kodieren_und_dekodieren() {
        #[derive(Serialize)]
        struct Ereignis {
            art: &'static str,
        }

        let mut buffer = OutBuffer::neu();
        state(1024)
            .write_to_buffer(&mut buffer, &Json(Ereignis { art: "join" }))
            .unwrap();

        let mut src = BytesMut::from(buffer.as_slice());
        let paket = PacketCodec::new().decode(&mut src).unwrap().unwrap();
        assert_eq!(&paket[..], br#"{"art":"join"}"#);
        assert!(src.is_empty());
    }

    #[test]
    fn decoder_wartet_auf_vollstaendiges_paket() {
        let mut codec = PacketCodec::new();
        let mut src = BytesMut::from(&b"\x00\x00"[..]);
        assert!(codec.decode(&mut src).unwrap().is_none());

        src.extend_from_slice(b"\x00\x03ab");
        assert!(codec.decode(&mut src).unwrap().is_none());

        src.extend_from_slice(b"c");
        let paket = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(&paket[..], b"abc");
    }

    #[test]
    fn decoder_liest_mehrere_pakete_nacheinander() {
        let st = state(64);
        let mut buffer = OutBuffer::neu();
        st.write_to_buffer(&mut buffer, &Text::neu("eins")).unwrap();
        st.write_to_buffer(&mut buffer, &Text::neu("zwei")).unwrap();

        let mut codec = st_codec();
        let mut src = BytesMut::from(buffer.as_slice());
        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[..], b"eins");
        assert_eq!(&codec.decode(&mut src).unwrap().unwrap()[..], b"zwei");
        assert!(codec.decode(&mut src).unwrap().is_none());
    }

    fn st_codec() -> PacketCodec {
        PacketProtocol::with_max_size(64).codec()
    }

    #[test]
    fn decoder_lehnt_zu_grosse_pakete_ab() {
        let mut codec = PacketCodec::with_max_size(8);
        let mut src = BytesMut::from(&b"\x00\x00\x01\x00"[..]);
        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(err, ProtocolError::PaketZuGross { groesse: 256, .. }));
    }
}
