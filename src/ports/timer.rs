//! PPM timer port
//!
//! One hardware timer serves both PPM roles: free-running input capture for
//! decoding, output compare with a reprogrammed period for encoding. Only one
//! role owns it at a time.

use crate::domain::{PpmResult, TimerEvent};

/// The shared capture/compare timer peripheral
pub trait PpmTimer {
    /// Configure free-running input capture with the given counter period and
    /// enable the capture and overflow interrupts.
    fn configure_capture(&mut self, period_ticks: u32) -> PpmResult<()>;

    /// Configure compare output: each period starts with a `mark_ticks` high
    /// pulse, the first period is `first_period_ticks` long.
    fn configure_compare(&mut self, first_period_ticks: u32, mark_ticks: u32) -> PpmResult<()>;

    /// Latch the pending interrupt sources and the captured value, and
    /// acknowledge them. Called once per interrupt in capture mode.
    fn take_event(&mut self) -> TimerEvent;

    /// Program the length of the next period in ticks (not the raw reload
    /// register value; adapters subtract one where the hardware needs it).
    fn set_period(&mut self, ticks: u32);

    /// Acknowledge every pending interrupt source without acting on it
    fn clear_pending(&mut self);

    /// Stop the counter, mask its interrupts and release the pins.
    /// Safe to call when already disabled.
    fn disable(&mut self);
}
