//! Saturating 31-bit tick accumulator

/// Tick count that sticks at `i32::MAX` instead of wrapping.
///
/// Pulse and link-silence timers are compared against thresholds; a wrapped
/// value would make a dead link look freshly alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Ticks31(u32);

impl Ticks31 {
    pub const MAX: Ticks31 = Ticks31(i32::MAX as u32);
    pub const ZERO: Ticks31 = Ticks31(0);

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn add(&mut self, ticks: u32) {
        self.0 = self.0.saturating_add(ticks).min(Self::MAX.0);
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_below_ceiling() {
        let mut t = Ticks31::ZERO;
        t.add(1_000);
        t.add(500);
        assert_eq!(t.get(), 1_500);
    }

    #[test]
    fn saturates_at_31_bits() {
        let mut t = Ticks31::ZERO;
        t.add(0x7fff_fff0);
        t.add(0x100);
        assert_eq!(t, Ticks31::MAX);
        t.add(u32::MAX);
        assert_eq!(t.get(), 0x7fff_ffff);
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut t = Ticks31::MAX;
        t.reset();
        assert_eq!(t, Ticks31::ZERO);
    }
}
