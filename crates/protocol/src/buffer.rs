//! Ausgabe-Buffer fuer kodierte Pakete
//!
//! Ein `OutBuffer` wird genau einmal beschrieben und danach mit
//! [`OutBuffer::einfrieren`] in ein unveraenderliches `Bytes` umgewandelt.
//! `Bytes` ist atomar referenzgezaehlt: jeder Sendevorgang haelt eine
//! eigene Referenz, der Speicher wird mit der letzten Referenz freigegeben.

use bytes::{BufMut, Bytes, BytesMut};

/// Beschreibbarer Buffer fuer genau ein ausgehendes Paket
#[derive(Debug, Default)]
pub struct OutBuffer {
    daten: BytesMut,
}

impl OutBuffer {
    /// Erstellt einen leeren Buffer
    pub fn neu() -> Self {
        Self::default()
    }

    /// Erstellt einen leeren Buffer mit vorbelegter Kapazitaet
    pub fn mit_kapazitaet(kapazitaet: usize) -> Self {
        Self {
            daten: BytesMut::with_capacity(kapazitaet),
        }
    }

    pub fn len(&self) -> usize {
        self.daten.len()
    }

    pub fn is_empty(&self) -> bool {
        self.daten.is_empty()
    }

    /// Reserviert Platz fuer mindestens `zusaetzlich` weitere Bytes
    pub fn reservieren(&mut self, zusaetzlich: usize) {
        self.daten.reserve(zusaetzlich);
    }

    /// Haengt Bytes an
    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.daten.put_slice(bytes);
    }

    /// Kuerzt den Buffer auf `laenge` Bytes (verwirft halb geschriebene Pakete)
    pub fn kuerzen(&mut self, laenge: usize) {
        self.daten.truncate(laenge);
    }

    /// Direkter Zugriff fuer Protokoll-Implementierungen
    pub fn daten_mut(&mut self) -> &mut BytesMut {
        &mut self.daten
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.daten
    }

    /// Friert den Buffer ein; das Ergebnis kann beliebig oft geteilt werden
    pub fn einfrieren(self) -> Bytes {
        self.daten.freeze()
    }
}
