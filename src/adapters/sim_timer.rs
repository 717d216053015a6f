//! Simulated PPM timer for running the PPM roles off-target.
//!
//! In capture mode, tests queue timer events (directly, or as edge-to-edge
//! gaps through `CaptureSynth`) and the interrupt handler drains them one per
//! call via `take_event`. In compare mode every period the encoder programs
//! is recorded, which is exactly the pulse train the pin would carry.

use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::HeapRb;

use crate::domain::{PpmError, PpmResult, TimerEvent};
use crate::ports::PpmTimer;

/// Pending interrupt events the simulated peripheral can hold
const EVENT_QUEUE_DEPTH: usize = 1024;

/// A capture this close after a wrap is latched by the same interrupt as the overflow
const COINCIDENT_TICKS: u32 = 16;

/// What the simulated peripheral is currently set up for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    Disabled,
    Capture { period: u32 },
    Compare { mark: u32 },
}

/// Converts edge-to-edge gaps into the interrupt events a free-running
/// counter with the given period would raise.
#[derive(Debug, Clone)]
pub struct CaptureSynth {
    period: u32,
    counter: u32,
}

impl CaptureSynth {
    pub fn new(period: u32) -> Self {
        Self { period, counter: 0 }
    }

    /// Events raised between the previous edge and one `gap` ticks later
    pub fn edge_after(&mut self, gap: u32) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        let to_wrap = self.period - self.counter;

        if gap < to_wrap {
            self.counter += gap;
            events.push(TimerEvent::capture(self.counter, self.period));
            return events;
        }

        let mut remaining = gap - to_wrap;
        loop {
            if remaining < self.period {
                if remaining < COINCIDENT_TICKS {
                    events.push(TimerEvent::overflow_with_capture(remaining, self.period));
                } else {
                    events.push(TimerEvent::overflow(self.period));
                    events.push(TimerEvent::capture(remaining, self.period));
                }
                self.counter = remaining;
                return events;
            }
            events.push(TimerEvent::overflow(self.period));
            remaining -= self.period;
        }
    }

    /// Let the counter run with no edges for `ticks`
    pub fn idle(&mut self, ticks: u32) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        let mut remaining = ticks;
        while remaining >= self.period - self.counter {
            remaining -= self.period - self.counter;
            self.counter = 0;
            events.push(TimerEvent::overflow(self.period));
        }
        self.counter += remaining;
        events
    }
}

pub struct SimTimer {
    mode: TimerMode,
    pending: HeapRb<TimerEvent>,
    synth: CaptureSynth,
    periods: Vec<u32>,
    cleared: usize,
}

impl SimTimer {
    pub fn new() -> Self {
        Self {
            mode: TimerMode::Disabled,
            pending: HeapRb::new(EVENT_QUEUE_DEPTH),
            synth: CaptureSynth::new(u32::MAX),
            periods: Vec::new(),
            cleared: 0,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Queue one interrupt. Returns `false` if the timer is disabled or the
    /// queue is full (the event is lost, as on hardware).
    pub fn raise(&mut self, event: TimerEvent) -> bool {
        if self.mode == TimerMode::Disabled {
            return false;
        }
        self.pending.try_push(event).is_ok()
    }

    /// Queue the events for an input edge `gap` ticks after the previous one
    pub fn raise_edge_after(&mut self, gap: u32) -> usize {
        let events = self.synth.edge_after(gap);
        events.into_iter().filter(|&e| self.raise(e)).count()
    }

    /// Queue the overflows for `ticks` of silence on the input pin
    pub fn raise_idle(&mut self, ticks: u32) -> usize {
        let events = self.synth.idle(ticks);
        events.into_iter().filter(|&e| self.raise(e)).count()
    }

    /// Queue a compare-match interrupt (compare mode only)
    pub fn raise_compare(&mut self) -> bool {
        matches!(self.mode, TimerMode::Compare { .. }) && self.raise(TimerEvent::default())
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Periods programmed so far in compare mode, oldest first
    pub fn programmed_periods(&self) -> &[u32] {
        &self.periods
    }

    pub fn take_periods(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.periods)
    }

    /// How many times pending interrupts were acknowledged without being handled
    pub fn cleared_count(&self) -> usize {
        self.cleared
    }

    fn drain(&mut self) {
        while self.pending.try_pop().is_some() {}
    }
}

impl Default for SimTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PpmTimer for SimTimer {
    fn configure_capture(&mut self, period_ticks: u32) -> PpmResult<()> {
        if period_ticks == 0 {
            return Err(PpmError::Timer("capture period must be non-zero".into()));
        }
        log::debug!("[SIM TIMER] capture mode, period {period_ticks} ticks");
        self.drain();
        self.synth = CaptureSynth::new(period_ticks);
        self.mode = TimerMode::Capture {
            period: period_ticks,
        };
        Ok(())
    }

    fn configure_compare(&mut self, first_period_ticks: u32, mark_ticks: u32) -> PpmResult<()> {
        if mark_ticks >= first_period_ticks {
            return Err(PpmError::Timer(format!(
                "mark {mark_ticks} does not fit in period {first_period_ticks}"
            )));
        }
        log::debug!(
            "[SIM TIMER] compare mode, first period {first_period_ticks} ticks, mark {mark_ticks}"
        );
        self.drain();
        self.periods.clear();
        self.mode = TimerMode::Compare { mark: mark_ticks };
        Ok(())
    }

    fn take_event(&mut self) -> TimerEvent {
        let period = match self.mode {
            TimerMode::Capture { period } => period,
            _ => 0,
        };
        self.pending.try_pop().unwrap_or(TimerEvent {
            period,
            ..TimerEvent::default()
        })
    }

    fn set_period(&mut self, ticks: u32) {
        self.periods.push(ticks);
    }

    fn clear_pending(&mut self) {
        self.drain();
        self.cleared += 1;
    }

    fn disable(&mut self) {
        if self.mode != TimerMode::Disabled {
            log::debug!("[SIM TIMER] disabled");
        }
        self.drain();
        self.mode = TimerMode::Disabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_gap_is_a_single_capture() {
        let mut synth = CaptureSynth::new(25_000);
        assert_eq!(synth.edge_after(9_000), vec![TimerEvent::capture(9_000, 25_000)]);
        assert_eq!(synth.edge_after(1_000), vec![TimerEvent::capture(10_000, 25_000)]);
    }

    #[test]
    fn gap_across_wrap_raises_overflow_then_capture() {
        let mut synth = CaptureSynth::new(25_000);
        synth.edge_after(24_000);
        assert_eq!(
            synth.edge_after(2_000),
            vec![TimerEvent::overflow(25_000), TimerEvent::capture(1_000, 25_000)]
        );
    }

    #[test]
    fn capture_right_after_wrap_shares_the_interrupt() {
        let mut synth = CaptureSynth::new(25_000);
        synth.edge_after(24_000);
        assert_eq!(
            synth.edge_after(1_005),
            vec![TimerEvent::overflow_with_capture(5, 25_000)]
        );
    }

    #[test]
    fn idle_raises_one_overflow_per_wrap() {
        let mut synth = CaptureSynth::new(25_000);
        synth.edge_after(5_000);
        assert_eq!(synth.idle(70_000).len(), 3);
        assert_eq!(synth.edge_after(0), vec![TimerEvent::capture(0, 25_000)]);
    }

    #[test]
    fn disabled_timer_drops_events() {
        let mut timer = SimTimer::new();
        assert!(!timer.raise(TimerEvent::capture(10, 25_000)));
        timer.configure_capture(25_000).unwrap();
        assert!(timer.raise(TimerEvent::capture(10, 25_000)));
        timer.disable();
        assert!(!timer.has_pending());
    }

    #[test]
    fn take_event_acknowledges_in_order() {
        let mut timer = SimTimer::new();
        timer.configure_capture(25_000).unwrap();
        timer.raise_edge_after(9_000);
        timer.raise_edge_after(1_000);
        assert_eq!(timer.take_event().captured_value, 9_000);
        assert_eq!(timer.take_event().captured_value, 10_000);
        let empty = timer.take_event();
        assert!(!empty.capture && !empty.overflow);
        assert_eq!(empty.period, 25_000);
    }

    #[test]
    fn compare_mode_records_programmed_periods() {
        let mut timer = SimTimer::new();
        assert!(timer.configure_compare(400, 480).is_err());
        timer.configure_compare(20_000, 480).unwrap();
        timer.set_period(20_000);
        timer.set_period(1_000);
        assert_eq!(timer.programmed_periods(), &[20_000, 1_000]);
        assert_eq!(timer.take_periods().len(), 2);
        assert!(timer.programmed_periods().is_empty());
    }
}
