//! PPM radio-control link bridge
//!
//! Decodes a PPM pulse train from an RC receiver into channel widths (TX end
//! of the link) or regenerates one from channel widths received over the
//! link (RX end), using a single capture/compare timer.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, no I/O dependencies
//! - `ports/` - Trait definitions for the timer peripheral and radio modem
//! - `timing/` - Tick arithmetic (pure functions, no I/O)
//! - `ppm/` - PPM decoder/encoder state machines
//! - `controller` - Mode controller owning the timer, link and active role
//! - `profiles` - Settings persistence
//! - `adapters/` - Implementations of ports (simulated timer, mock link)

// Core domain (pure, no I/O)
pub mod domain;
pub mod ppm;
pub mod ports;
pub mod timing;

pub mod controller;
pub mod profiles;

// Adapters (external I/O)
pub mod adapters;

pub use controller::PpmController;
