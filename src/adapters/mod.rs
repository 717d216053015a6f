//! Adapters: implementations of the ports for the host
//!
//! - `sim_timer` - simulated capture/compare timer, driven by tests and the
//!   loopback binary
//! - `mock_link` - logging stand-in for the radio modem

pub mod mock_link;
pub mod sim_timer;

pub use mock_link::MockLink;
pub use sim_timer::{CaptureSynth, SimTimer, TimerMode};
