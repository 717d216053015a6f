//! Core domain types

use serde::{Deserialize, Serialize};

/// Channel capacity of every channel table (fixed at build time)
pub const MAX_CHANNELS: usize = 8;

/// Pulse width in microseconds. The PPM timer runs at 1 MHz, so one tick is one µs.
pub type Micros = u32;

/// Which end of the RC link this unit plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// No PPM role, timer released
    #[default]
    Uninitialized,
    /// TX end: decode PPM from a receiver and forward channel values over the link
    Decode,
    /// RX end: regenerate PPM from channel values received over the link
    Encode,
}

impl std::fmt::Display for LinkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkMode::Uninitialized => "uninitialized",
            LinkMode::Decode => "decode",
            LinkMode::Encode => "encode",
        };
        f.write_str(name)
    }
}

/// One interrupt's worth of timer state, as latched by the timer port.
///
/// `overflow` means the free-running counter wrapped its period since the last
/// event; `capture` means an input edge latched `captured_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerEvent {
    pub overflow: bool,
    pub capture: bool,
    pub captured_value: u32,
    pub period: u32,
}

impl TimerEvent {
    pub fn capture(value: u32, period: u32) -> Self {
        Self {
            overflow: false,
            capture: true,
            captured_value: value,
            period,
        }
    }

    pub fn overflow(period: u32) -> Self {
        Self {
            overflow: true,
            capture: false,
            captured_value: 0,
            period,
        }
    }

    /// Overflow and capture latched by the same interrupt
    pub fn overflow_with_capture(value: u32, period: u32) -> Self {
        Self {
            overflow: true,
            capture: true,
            captured_value: value,
            period,
        }
    }
}

/// RFM22B transmit power step (0 = +1 dBm ... 7 = +20 dBm)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TxPower(u8);

impl TxPower {
    pub const MAX: TxPower = TxPower(7);

    pub fn new(step: u8) -> Option<Self> {
        (step <= Self::MAX.0).then_some(Self(step))
    }

    pub fn step(&self) -> u8 {
        self.0
    }
}

impl Default for TxPower {
    fn default() -> Self {
        Self::MAX
    }
}

impl TryFrom<u8> for TxPower {
    type Error = String;

    fn try_from(step: u8) -> Result<Self, Self::Error> {
        TxPower::new(step).ok_or_else(|| format!("tx power step {step} out of range 0..=7"))
    }
}

impl From<TxPower> for u8 {
    fn from(power: TxPower) -> Self {
        power.0
    }
}

/// An ordered set of channel pulse widths. Index is the channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTable {
    widths: [Micros; MAX_CHANNELS],
    len: usize,
}

impl ChannelTable {
    pub const fn empty() -> Self {
        Self {
            widths: [0; MAX_CHANNELS],
            len: 0,
        }
    }

    /// Build a table from a slice; returns `None` if it exceeds `MAX_CHANNELS`.
    pub fn from_slice(widths: &[Micros]) -> Option<Self> {
        if widths.len() > MAX_CHANNELS {
            return None;
        }
        let mut table = Self::empty();
        table.widths[..widths.len()].copy_from_slice(widths);
        table.len = widths.len();
        Some(table)
    }

    /// Take the first `len` entries of a full-capacity array
    pub(crate) fn from_array(widths: [Micros; MAX_CHANNELS], len: usize) -> Self {
        Self {
            widths,
            len: len.min(MAX_CHANNELS),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, channel: usize) -> Option<Micros> {
        self.as_slice().get(channel).copied()
    }

    pub fn as_slice(&self) -> &[Micros] {
        &self.widths[..self.len]
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::empty()
    }
}

/// Health snapshot of the active PPM role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LinkStats {
    pub mode: LinkMode,
    pub frames: u32,
    pub errors: u32,
    pub channels_detected: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_table_rejects_oversized_slice() {
        assert!(ChannelTable::from_slice(&[1000; MAX_CHANNELS + 1]).is_none());
        let table = ChannelTable::from_slice(&[1000, 1500]).unwrap();
        assert_eq!(table.as_slice(), &[1000, 1500]);
        assert_eq!(table.get(2), None);
    }

    #[test]
    fn tx_power_is_bounded() {
        assert_eq!(TxPower::new(7), Some(TxPower::MAX));
        assert!(TxPower::new(8).is_none());
        assert!(serde_json::from_str::<TxPower>("9").is_err());
        assert_eq!(serde_json::from_str::<TxPower>("3").unwrap().step(), 3);
    }

    #[test]
    fn link_mode_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&LinkMode::Decode).unwrap(), "\"decode\"");
    }
}
