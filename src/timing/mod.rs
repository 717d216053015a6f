//! Timing utilities shared by the PPM roles
//!
//! Pure arithmetic, no I/O: saturating tick accumulators and elapsed-time
//! recovery from a wrapping hardware counter.

pub mod capture_clock;
pub mod ticks;

pub use capture_clock::CaptureClock;
pub use ticks::Ticks31;
