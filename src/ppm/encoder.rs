//! PPM output encoder - turns a channel table into timer periods
//!
//! The timer runs in compare mode: every period starts with a fixed mark
//! pulse and the period length is the information. On each compare-match
//! the encoder hands back the length of the next period:
//!
//!   sync, ch0, ch1, ... ch(n-1), sync, ch0, ...
//!
//! Each channel width is subtracted from a budget that starts at the frame
//! period, and the sync slot takes whatever is left, so a frame always lasts
//! exactly one frame period. If the channels overrun the budget the sync slot
//! is floored at `min_sync_pulse_us` and the frame stretches instead.

use std::sync::Arc;

use crate::domain::{ChannelTable, Micros, OutputParams, PpmError, PpmResult, MAX_CHANNELS};
use crate::ppm::shared::TableCell;

/// Interrupt-side encoder state
pub struct PpmEncoder {
    params: OutputParams,

    /// `None` for the sync slot, else the channel to emit next
    slot: Option<u8>,

    /// Frame time not yet spent on channels
    sync_budget: Micros,

    /// Latched at each sync slot so a frame never mixes two tables
    channels_used: u8,
    frame: [Micros; MAX_CHANNELS],

    desired: Arc<TableCell>,
}

impl PpmEncoder {
    pub fn new(params: OutputParams) -> Self {
        let defaults = [params.default_channel_us; MAX_CHANNELS];
        Self {
            params,
            slot: None,
            sync_budget: params.frame_period_us,
            channels_used: 0,
            frame: defaults,
            desired: Arc::new(TableCell::new(&defaults, 0)),
        }
    }

    /// Main-loop handle for publishing the desired table
    pub fn writer(&self) -> ChannelWriter {
        ChannelWriter {
            cell: Arc::clone(&self.desired),
            default_width: self.params.default_channel_us,
        }
    }

    /// Length of the first period, before any compare-match
    pub fn first_period(&self) -> Micros {
        self.params.frame_period_us
    }

    pub fn mark_pulse(&self) -> Micros {
        self.params.mark_pulse_us
    }

    /// Handle one compare-match; returns the period to program next.
    pub fn on_compare_match(&mut self) -> Micros {
        match self.slot {
            None => {
                let period = self.sync_budget.max(self.params.min_sync_pulse_us);
                self.sync_budget = self.params.frame_period_us;

                // a table still being written is picked up next frame
                if let Some((widths, len)) = self.desired.try_read() {
                    self.frame = widths;
                    self.channels_used = len.min(MAX_CHANNELS) as u8;
                }
                if self.channels_used > 0 {
                    self.slot = Some(0);
                }
                period
            }
            Some(channel) => {
                let width = self.frame[channel as usize]
                    .clamp(self.params.min_channel_pulse_us, self.params.max_channel_pulse_us);
                self.sync_budget = self.sync_budget.saturating_sub(width);

                let next = channel as usize + 1;
                self.slot = if next >= self.channels_used as usize || next >= MAX_CHANNELS {
                    None
                } else {
                    Some(next as u8)
                };
                width
            }
        }
    }

    pub fn channels_used(&self) -> u8 {
        self.channels_used
    }
}

/// Main-loop writer of the encoder's desired table
pub struct ChannelWriter {
    cell: Arc<TableCell>,
    default_width: Micros,
}

impl ChannelWriter {
    /// Publish a new desired table. Picked up at the start of the next frame.
    pub fn set_channel_widths(&self, widths: &[Micros]) -> PpmResult<()> {
        if widths.len() > MAX_CHANNELS {
            return Err(PpmError::TooManyChannels {
                given: widths.len(),
                max: MAX_CHANNELS,
            });
        }
        let mut table = [self.default_width; MAX_CHANNELS];
        table[..widths.len()].copy_from_slice(widths);
        self.cell.write(&table, widths.len());
        Ok(())
    }

    pub fn current(&self) -> ChannelTable {
        self.cell.table()
    }
}
