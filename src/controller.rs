//! PPM mode controller
//!
//! Owns the shared timer, the radio link and whichever PPM role is active.
//! Exactly one of decoder or encoder runs at a time; `init` tears down the
//! previous role before bringing up the next, and `deinit` always leaves the
//! timer disabled with no role.
//!
//! Two entry points run in different contexts:
//! - `on_timer_interrupt` is the timer interrupt vector
//! - `process` and the channel accessors belong to the main loop

use crate::domain::{
    ChannelError, ChannelTable, LinkMode, LinkSettings, LinkStats, Micros, PpmError, PpmResult,
};
use crate::ports::{LinkStream, PpmTimer, RadioLink};
use crate::ppm::{ChannelWriter, FrameMonitor, PpmDecoder, PpmEncoder};

/// The role currently driving the timer
enum ActiveRole {
    Idle,
    Decode {
        decoder: PpmDecoder,
        monitor: FrameMonitor,
    },
    Encode {
        encoder: PpmEncoder,
        writer: ChannelWriter,
    },
}

impl ActiveRole {
    fn mode(&self) -> LinkMode {
        match self {
            ActiveRole::Idle => LinkMode::Uninitialized,
            ActiveRole::Decode { .. } => LinkMode::Decode,
            ActiveRole::Encode { .. } => LinkMode::Encode,
        }
    }
}

/// Byte-stream callbacks handed to the modem.
///
/// Channel tables are not framed onto the link yet: nothing is ever offered
/// for sending and every received block is accepted.
#[derive(Debug, Clone, Copy)]
pub struct PpmStream {
    mode: LinkMode,
}

impl PpmStream {
    pub fn mode(&self) -> LinkMode {
        self.mode
    }
}

impl LinkStream for PpmStream {
    fn next_byte_to_send(&mut self) -> Option<u8> {
        None
    }

    fn bytes_received(&mut self, _data: &[u8]) -> bool {
        true
    }
}

pub struct PpmController<T: PpmTimer, L: RadioLink> {
    timer: T,
    link: L,
    settings: LinkSettings,
    role: ActiveRole,
}

impl<T: PpmTimer, L: RadioLink> PpmController<T, L> {
    pub fn new(timer: T, link: L, settings: LinkSettings) -> PpmResult<Self> {
        settings.validate()?;
        Ok(Self {
            timer,
            link,
            settings,
            role: ActiveRole::Idle,
        })
    }

    pub fn mode(&self) -> LinkMode {
        self.role.mode()
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    /// Replace the stored settings. Takes effect at the next `init`.
    pub fn update_settings(&mut self, settings: LinkSettings) -> PpmResult<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Bring up the role named in the stored settings
    pub fn init_from_settings(&mut self) -> PpmResult<()> {
        self.init(self.settings.mode)
    }

    /// Tear down any active role, then configure the timer and the radio for `mode`.
    ///
    /// The new role only becomes visible to the interrupt handler once every
    /// step succeeded; on failure the timer is left disabled.
    pub fn init(&mut self, mode: LinkMode) -> PpmResult<()> {
        self.deinit();
        log::info!("PPM init: {mode} mode");

        match self.bring_up(mode) {
            Ok(role) => {
                self.role = role;
                Ok(())
            }
            Err(e) => {
                log::warn!("PPM init failed: {e}");
                self.timer.disable();
                Err(e)
            }
        }
    }

    fn bring_up(&mut self, mode: LinkMode) -> PpmResult<ActiveRole> {
        let s = &self.settings;

        let role = match mode {
            LinkMode::Uninitialized => {
                return Err(PpmError::Config("no PPM mode selected".into()));
            }
            LinkMode::Decode => {
                let decoder = PpmDecoder::new(s.input);
                let monitor = decoder.monitor();
                self.timer.configure_capture(s.input.capture_period_ticks)?;
                self.link.init_tx_stream(s.min_frequency_hz, s.max_frequency_hz)?;
                ActiveRole::Decode { decoder, monitor }
            }
            LinkMode::Encode => {
                let encoder = PpmEncoder::new(s.output);
                let writer = encoder.writer();
                self.timer
                    .configure_compare(encoder.first_period(), encoder.mark_pulse())?;
                self.link.init_rx_stream(s.min_frequency_hz, s.max_frequency_hz)?;
                ActiveRole::Encode { encoder, writer }
            }
        };

        self.link.attach_stream(Box::new(PpmStream { mode }));
        self.link.set_freq_calibration(s.rf_xtal_cap)?;
        self.link.set_nominal_carrier_frequency(s.frequency_hz)?;
        self.link.set_datarate(s.max_rf_bandwidth)?;
        self.link.set_tx_power(s.max_tx_power)?;

        if mode == LinkMode::Decode {
            self.link.start_tx_stream()?;
        }
        Ok(role)
    }

    /// Disable the timer and drop the active role. Safe from any state.
    pub fn deinit(&mut self) {
        self.timer.disable();
        if !matches!(self.role, ActiveRole::Idle) {
            log::info!("PPM deinit: leaving {} mode", self.role.mode());
        }
        self.role = ActiveRole::Idle;
    }

    /// Timer interrupt vector: one dispatch to the active role.
    pub fn on_timer_interrupt(&mut self) {
        match &mut self.role {
            ActiveRole::Decode { decoder, .. } => {
                let event = self.timer.take_event();
                decoder.on_timer_event(&event);
            }
            ActiveRole::Encode { encoder, .. } => {
                self.timer.take_event();
                let period = encoder.on_compare_match();
                self.timer.set_period(period);
            }
            ActiveRole::Idle => self.timer.clear_pending(),
        }
    }

    /// Main-loop step. In decode mode, returns the newly committed channel
    /// table once per frame; otherwise `None`.
    pub fn process(&mut self) -> Option<ChannelTable> {
        let ActiveRole::Decode { monitor, .. } = &mut self.role else {
            return None;
        };
        let snapshot = monitor.next_frame()?;
        let table = snapshot.table();
        log::debug!(
            "ppm_in: {:5} {:5} .. {:?}",
            snapshot.frames,
            snapshot.errors,
            table.as_slice()
        );
        Some(table)
    }

    /// Frame counter of a newly committed frame, at most once per commit
    pub fn new_frame_available(&mut self) -> Option<u32> {
        match &mut self.role {
            ActiveRole::Decode { monitor, .. } => monitor.new_frame_available(),
            _ => None,
        }
    }

    /// Last committed width of `channel` (decode mode)
    pub fn channel_width(&self, channel: usize) -> Result<Micros, ChannelError> {
        match &self.role {
            ActiveRole::Decode { monitor, .. } => monitor.channel_width(channel),
            _ => Err(ChannelError::NotReady),
        }
    }

    /// Publish the widths the encoder should emit (encode mode)
    pub fn set_channel_widths(&self, widths: &[Micros]) -> PpmResult<()> {
        match &self.role {
            ActiveRole::Encode { writer, .. } => writer.set_channel_widths(widths),
            ActiveRole::Idle => Err(PpmError::NotReady),
            ActiveRole::Decode { .. } => Err(PpmError::ModeUnavailable {
                expected: LinkMode::Encode,
                actual: LinkMode::Decode,
            }),
        }
    }

    /// Desired table the encoder is working from (encode mode)
    pub fn desired_widths(&self) -> Option<ChannelTable> {
        match &self.role {
            ActiveRole::Encode { writer, .. } => Some(writer.current()),
            _ => None,
        }
    }

    pub fn stats(&self) -> LinkStats {
        let mode = self.role.mode();
        match &self.role {
            ActiveRole::Decode { monitor, .. } => {
                let snapshot = monitor.snapshot();
                LinkStats {
                    mode,
                    frames: snapshot.frames,
                    errors: snapshot.errors,
                    channels_detected: snapshot.channels_detected,
                }
            }
            ActiveRole::Encode { encoder, .. } => LinkStats {
                mode,
                channels_detected: encoder.channels_used(),
                ..LinkStats::default()
            },
            ActiveRole::Idle => LinkStats::default(),
        }
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

impl<T: PpmTimer, L: RadioLink> Drop for PpmController<T, L> {
    fn drop(&mut self) {
        self.timer.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockLink, SimTimer, TimerMode};

    fn controller() -> PpmController<SimTimer, MockLink> {
        PpmController::new(SimTimer::new(), MockLink::new(), LinkSettings::default()).unwrap()
    }

    #[test]
    fn starts_uninitialized_and_not_ready() {
        let mut ctl = controller();
        assert_eq!(ctl.mode(), LinkMode::Uninitialized);
        assert_eq!(ctl.channel_width(0), Err(ChannelError::NotReady));
        assert_eq!(ctl.new_frame_available(), None);
        assert!(matches!(ctl.set_channel_widths(&[1000]), Err(PpmError::NotReady)));
        assert!(ctl.process().is_none());
    }

    #[test]
    fn init_uninitialized_is_rejected_and_leaves_timer_off() {
        let mut ctl = controller();
        ctl.init(LinkMode::Encode).unwrap();
        assert!(matches!(ctl.init(LinkMode::Uninitialized), Err(PpmError::Config(_))));
        assert_eq!(ctl.mode(), LinkMode::Uninitialized);
        assert_eq!(ctl.timer().mode(), TimerMode::Disabled);
    }

    #[test]
    fn idle_interrupt_only_acknowledges() {
        let mut ctl = controller();
        ctl.on_timer_interrupt();
        assert_eq!(ctl.timer().cleared_count(), 1);
    }

    #[test]
    fn deinit_is_idempotent() {
        let mut ctl = controller();
        ctl.init(LinkMode::Decode).unwrap();
        ctl.deinit();
        ctl.deinit();
        assert_eq!(ctl.mode(), LinkMode::Uninitialized);
        assert_eq!(ctl.timer().mode(), TimerMode::Disabled);
    }

    #[test]
    fn link_failure_leaves_controller_idle() {
        let mut ctl =
            PpmController::new(SimTimer::new(), MockLink::failing(), LinkSettings::default())
                .unwrap();
        assert!(matches!(ctl.init(LinkMode::Decode), Err(PpmError::Link(_))));
        assert_eq!(ctl.mode(), LinkMode::Uninitialized);
        assert_eq!(ctl.timer().mode(), TimerMode::Disabled);
    }

    #[test]
    fn decode_mode_rejects_encoder_table() {
        let mut ctl = controller();
        ctl.init(LinkMode::Decode).unwrap();
        assert!(matches!(
            ctl.set_channel_widths(&[1000]),
            Err(PpmError::ModeUnavailable { expected: LinkMode::Encode, actual: LinkMode::Decode })
        ));
        assert!(ctl.desired_widths().is_none());
    }

    #[test]
    fn invalid_settings_rejected_up_front() {
        let settings = LinkSettings {
            min_frequency_hz: 440_000_000,
            max_frequency_hz: 430_000_000,
            ..LinkSettings::default()
        };
        assert!(PpmController::new(SimTimer::new(), MockLink::new(), settings).is_err());
        let mut ctl = controller();
        assert!(ctl
            .update_settings(LinkSettings {
                max_rf_bandwidth: 0,
                ..LinkSettings::default()
            })
            .is_err());
    }

    #[test]
    fn stream_callbacks_never_offer_bytes() {
        let mut stream = PpmStream { mode: LinkMode::Decode };
        assert_eq!(stream.next_byte_to_send(), None);
        assert!(stream.bytes_received(&[1, 2, 3]));
        assert_eq!(stream.mode(), LinkMode::Decode);
    }
}
