//! Wireless modem ports
//!
//! `RadioLink` is what the mode controller configures at init. `LinkStream`
//! is the other direction: the modem driver pulls outgoing bytes from it and
//! pushes received bytes into it.

use crate::domain::{PpmResult, TxPower};

/// The radio modem carrying the link
pub trait RadioLink {
    /// Prepare a continuous transmit stream within the frequency bounds
    fn init_tx_stream(&mut self, min_frequency_hz: u32, max_frequency_hz: u32) -> PpmResult<()>;

    /// Prepare a continuous receive stream within the frequency bounds
    fn init_rx_stream(&mut self, min_frequency_hz: u32, max_frequency_hz: u32) -> PpmResult<()>;

    /// Hand the modem the byte-stream callbacks for this role
    fn attach_stream(&mut self, stream: Box<dyn LinkStream + Send>);

    fn set_freq_calibration(&mut self, xtal_cap: u8) -> PpmResult<()>;

    fn set_nominal_carrier_frequency(&mut self, frequency_hz: u32) -> PpmResult<()>;

    /// Air data rate in bits/s
    fn set_datarate(&mut self, bandwidth: u32) -> PpmResult<()>;

    fn set_tx_power(&mut self, power: TxPower) -> PpmResult<()>;

    /// Start transmitting the stream
    fn start_tx_stream(&mut self) -> PpmResult<()>;
}

/// Byte-stream callbacks the modem calls into
pub trait LinkStream {
    /// Next byte for the outgoing packet, `None` when there is nothing more
    fn next_byte_to_send(&mut self) -> Option<u8>;

    /// A block of received bytes; return `false` to abandon the current packet
    fn bytes_received(&mut self, data: &[u8]) -> bool;
}
