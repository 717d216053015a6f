//! Mock radio link for development and testing without an RF module.
//!
//! Every RadioLink call is logged at INFO level and remembered, so tests and
//! the loopback binary can check exactly what the controller asked the modem
//! to do:
//!
//!   RUST_LOG=ppm_link_lib=info cargo run --bin ppm-loopback

use crate::domain::{PpmError, PpmResult, TxPower};
use crate::ports::{LinkStream, RadioLink};

/// Stream direction the modem was prepared for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Tx,
    Rx,
}

/// Modem configuration as last set by the controller
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MockLinkState {
    pub direction: Option<StreamDirection>,
    pub frequency_bounds: Option<(u32, u32)>,
    pub xtal_cap: Option<u8>,
    pub carrier_hz: Option<u32>,
    pub datarate: Option<u32>,
    pub tx_power: Option<TxPower>,
    pub transmitting: bool,
}

pub struct MockLink {
    state: MockLinkState,
    stream: Option<Box<dyn LinkStream + Send>>,
    fail_init: bool,
}

impl MockLink {
    pub fn new() -> Self {
        log::info!("[MOCK LINK] Initialized");
        Self {
            state: MockLinkState::default(),
            stream: None,
            fail_init: false,
        }
    }

    /// A link whose stream init always fails, for exercising error paths
    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::new()
        }
    }

    pub fn state(&self) -> &MockLinkState {
        &self.state
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Ask the attached stream for the next byte, as the modem's TX path would
    pub fn poll_tx_byte(&mut self) -> Option<u8> {
        self.stream.as_mut()?.next_byte_to_send()
    }

    /// Deliver received bytes to the attached stream, as the modem's RX path would.
    /// Returns `false` when nothing is attached or the stream abandons the packet.
    pub fn deliver(&mut self, data: &[u8]) -> bool {
        match self.stream.as_mut() {
            Some(stream) => stream.bytes_received(data),
            None => false,
        }
    }

    fn init_stream(&mut self, direction: StreamDirection, min: u32, max: u32) -> PpmResult<()> {
        if self.fail_init {
            return Err(PpmError::Link(format!("{direction:?} stream init refused")));
        }
        log::info!("[MOCK LINK] {direction:?} stream {:.3}..{:.3} MHz", min as f64 / 1e6, max as f64 / 1e6);
        self.state.direction = Some(direction);
        self.state.frequency_bounds = Some((min, max));
        self.state.transmitting = false;
        Ok(())
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioLink for MockLink {
    fn init_tx_stream(&mut self, min_frequency_hz: u32, max_frequency_hz: u32) -> PpmResult<()> {
        self.init_stream(StreamDirection::Tx, min_frequency_hz, max_frequency_hz)
    }

    fn init_rx_stream(&mut self, min_frequency_hz: u32, max_frequency_hz: u32) -> PpmResult<()> {
        self.init_stream(StreamDirection::Rx, min_frequency_hz, max_frequency_hz)
    }

    fn attach_stream(&mut self, stream: Box<dyn LinkStream + Send>) {
        log::info!("[MOCK LINK] stream callbacks attached");
        self.stream = Some(stream);
    }

    fn set_freq_calibration(&mut self, xtal_cap: u8) -> PpmResult<()> {
        log::info!("[MOCK LINK] XTAL CAP → 0x{xtal_cap:02x}");
        self.state.xtal_cap = Some(xtal_cap);
        Ok(())
    }

    fn set_nominal_carrier_frequency(&mut self, frequency_hz: u32) -> PpmResult<()> {
        log::info!("[MOCK LINK] CARRIER → {:.3} MHz", frequency_hz as f64 / 1e6);
        self.state.carrier_hz = Some(frequency_hz);
        Ok(())
    }

    fn set_datarate(&mut self, bandwidth: u32) -> PpmResult<()> {
        log::info!("[MOCK LINK] DATARATE → {bandwidth} bps");
        self.state.datarate = Some(bandwidth);
        Ok(())
    }

    fn set_tx_power(&mut self, power: TxPower) -> PpmResult<()> {
        log::info!("[MOCK LINK] TX POWER → step {}", power.step());
        self.state.tx_power = Some(power);
        Ok(())
    }

    fn start_tx_stream(&mut self) -> PpmResult<()> {
        if self.state.direction != Some(StreamDirection::Tx) {
            return Err(PpmError::Link("TX stream not initialised".into()));
        }
        log::info!("[MOCK LINK] TX stream started");
        self.state.transmitting = true;
        Ok(())
    }
}
