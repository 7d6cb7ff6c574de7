//! Sound level reading

use core::fmt;

use serde::Serialize;

/// One reporting interval's sound levels in dB SPL
///
/// The three values come from independent register reads, so the device may
/// update between them; small skew (e.g. `current` slightly outside
/// `min..=max`) is accepted.
///
/// Serializes to the telemetry body `{"dBa":N,"min":N,"max":N}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reading {
    #[serde(rename = "dBa")]
    pub current: u8,
    pub min: u8,
    pub max: u8,
}

impl Reading {
    pub const fn new(current: u8, min: u8, max: u8) -> Self {
        Self { current, min, max }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sound Level (dB SPL) = {:03} / min {:03} / max {:03}",
            self.current, self.min, self.max
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Reading {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", defmt::Display2Format(self))
    }
}
