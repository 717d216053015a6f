//! Elapsed ticks between input captures on a wrapping counter

use crate::domain::TimerEvent;

/// Tracks the last captured counter value so each timer event can be turned
/// into "ticks since the previous event".
///
/// An overflow forgets the previous capture: the time up to the wrap is
/// accounted for in that event, and counting restarts from zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureClock {
    previous: Option<u32>,
}

impl CaptureClock {
    pub fn new() -> Self {
        Self { previous: None }
    }

    /// Ticks elapsed since the last event, updating the stored capture.
    pub fn elapsed(&mut self, event: &TimerEvent) -> u32 {
        let new_value = if event.capture { event.captured_value } else { 0 };

        let ticks = if event.overflow {
            let ticks = match self.previous {
                Some(prev) => event.period.wrapping_sub(prev).wrapping_add(new_value),
                None => event.period.wrapping_add(new_value),
            };
            self.previous = None;
            ticks
        } else if event.capture {
            match self.previous {
                Some(prev) => new_value.wrapping_sub(prev),
                None => new_value,
            }
        } else {
            0
        };

        if event.capture {
            self.previous = Some(new_value);
        }
        ticks
    }
}
