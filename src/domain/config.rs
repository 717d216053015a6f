//! Link settings
//!
//! `LinkSettings` is the persisted configuration the mode controller reads at
//! init: which PPM role to run, the radio parameters handed to the modem, and
//! the pulse-timing thresholds for the decoder and encoder.

use serde::{Deserialize, Serialize};

use super::{LinkMode, Micros, PpmError, PpmResult, TxPower};

fn default_frequency_hz() -> u32 {
    434_000_000
}

/// Decoder timing thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputParams {
    /// Free-running capture timer period in ticks
    pub capture_period_ticks: u32,
    /// Anything at least this wide starts a frame (some 6-channel TXs go down to 8.8 ms)
    pub min_sync_pulse_us: Micros,
    /// Narrower channel pulses are noise
    pub min_channel_pulse_us: Micros,
    /// Wider pulses end the frame
    pub max_channel_pulse_us: Micros,
    /// No valid frame for this long means the link is lost
    pub stale_frame_timeout_us: Micros,
    /// A channel jumping at least this far between passes counts as noisy
    pub jitter_threshold_us: Micros,
    /// Frames with more noisy channels than this are discarded
    pub max_noisy_channels: u8,
}

impl Default for InputParams {
    fn default() -> Self {
        Self {
            capture_period_ticks: 25_000,
            min_sync_pulse_us: 7_000,
            min_channel_pulse_us: 750,
            max_channel_pulse_us: 2_400,
            stale_frame_timeout_us: 200_000,
            jitter_threshold_us: 600,
            max_noisy_channels: 2,
        }
    }
}

/// Encoder timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputParams {
    /// Nominal frame period; sync absorbs whatever the channels leave over
    pub frame_period_us: Micros,
    /// Fixed high time at the start of every slot
    pub mark_pulse_us: Micros,
    pub min_channel_pulse_us: Micros,
    pub max_channel_pulse_us: Micros,
    /// Floor for the sync slot when the channels overrun the frame period
    pub min_sync_pulse_us: Micros,
    /// Width every channel starts at before the application supplies a table
    pub default_channel_us: Micros,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            frame_period_us: 20_000,
            mark_pulse_us: 480,
            min_channel_pulse_us: 850,
            max_channel_pulse_us: 2_200,
            min_sync_pulse_us: 480,
            default_channel_us: 1_000,
        }
    }
}

/// Persisted settings for one unit of the link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub mode: LinkMode,
    pub min_frequency_hz: u32,
    pub max_frequency_hz: u32,
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: u32,
    /// Air data rate in bits/s
    pub max_rf_bandwidth: u32,
    pub max_tx_power: TxPower,
    /// Crystal load capacitance trim register value
    pub rf_xtal_cap: u8,
    pub input: InputParams,
    pub output: OutputParams,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            mode: LinkMode::Uninitialized,
            min_frequency_hz: 430_000_000,
            max_frequency_hz: 440_000_000,
            frequency_hz: default_frequency_hz(),
            max_rf_bandwidth: 128_000,
            max_tx_power: TxPower::default(),
            rf_xtal_cap: 0x7f,
            input: InputParams::default(),
            output: OutputParams::default(),
        }
    }
}

impl LinkSettings {
    pub fn with_mode(mut self, mode: LinkMode) -> Self {
        self.mode = mode;
        self
    }

    /// Reject settings the decoder/encoder or the modem cannot run with.
    pub fn validate(&self) -> PpmResult<()> {
        if self.min_frequency_hz > self.max_frequency_hz {
            return Err(config_error(format!(
                "frequency bounds inverted: {} > {}",
                self.min_frequency_hz, self.max_frequency_hz
            )));
        }
        if !(self.min_frequency_hz..=self.max_frequency_hz).contains(&self.frequency_hz) {
            return Err(config_error(format!(
                "carrier {} Hz outside {}..={} Hz",
                self.frequency_hz, self.min_frequency_hz, self.max_frequency_hz
            )));
        }
        if self.max_rf_bandwidth == 0 {
            return Err(config_error("rf bandwidth must be non-zero".into()));
        }

        let input = &self.input;
        if input.capture_period_ticks == 0 {
            return Err(config_error("capture period must be non-zero".into()));
        }
        if input.stale_frame_timeout_us == 0 {
            return Err(config_error("stale frame timeout must be non-zero".into()));
        }
        if input.jitter_threshold_us == 0 {
            return Err(config_error("jitter threshold must be non-zero".into()));
        }
        if input.min_channel_pulse_us >= input.max_channel_pulse_us {
            return Err(config_error(format!(
                "input channel range {}..{} is empty",
                input.min_channel_pulse_us, input.max_channel_pulse_us
            )));
        }
        if input.max_channel_pulse_us >= input.min_sync_pulse_us {
            return Err(config_error(format!(
                "input sync threshold {} must exceed max channel {}",
                input.min_sync_pulse_us, input.max_channel_pulse_us
            )));
        }

        let output = &self.output;
        if output.frame_period_us == 0 {
            return Err(config_error("frame period must be non-zero".into()));
        }
        if output.min_channel_pulse_us >= output.max_channel_pulse_us {
            return Err(config_error(format!(
                "output channel range {}..{} is empty",
                output.min_channel_pulse_us, output.max_channel_pulse_us
            )));
        }
        if output.mark_pulse_us >= output.min_channel_pulse_us {
            return Err(config_error(format!(
                "mark pulse {} must be shorter than min channel {}",
                output.mark_pulse_us, output.min_channel_pulse_us
            )));
        }
        if output.min_sync_pulse_us < output.mark_pulse_us {
            return Err(config_error(format!(
                "sync floor {} below mark pulse {}",
                output.min_sync_pulse_us, output.mark_pulse_us
            )));
        }
        Ok(())
    }
}

fn config_error(msg: String) -> PpmError {
    log::warn!("Rejected link settings: {msg}");
    PpmError::Config(msg)
}
