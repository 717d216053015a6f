//! Port traits (interfaces)
//!
//! These traits define the boundaries between the PPM core and the hardware
//! it runs on. Adapters implement them for real peripherals or for the host
//! simulation.

pub mod link;
pub mod timer;

pub use link::*;
pub use timer::*;
