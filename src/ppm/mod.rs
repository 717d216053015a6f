//! PPM core
//!
//! The input decoder and output encoder state machines, and the cells they
//! share with main-loop code.

pub mod decoder;
pub mod encoder;
pub mod shared;

pub use decoder::{FrameMonitor, PpmDecoder};
pub use encoder::{ChannelWriter, PpmEncoder};
pub use shared::FrameSnapshot;
