//! PPM input decoder - turns timer capture/overflow events into channel widths
//!
//! Pipeline: timer event → elapsed ticks (across counter wraps) → pulse
//!           classification (sync / channel / noise) → provisional frame
//!           → commit when the frame matches the previous one
//!
//! A PPM frame is a wide sync gap followed by one gap per channel. Every
//! rising edge is captured, so the width of a channel is simply the time
//! since the previous capture. Frames are only trusted when two in a row
//! carry the same channel count and few channels jumped around; everything
//! else bumps the error counter and waits for the next sync.
//!
//! `on_timer_event` runs in interrupt context: bounded work, no allocation,
//! no logging. The main loop reads results through a `FrameMonitor`.

use std::num::Saturating;
use std::sync::Arc;

use crate::domain::{ChannelError, InputParams, Micros, TimerEvent, MAX_CHANNELS};
use crate::ppm::shared::{FrameCell, FrameSnapshot};
use crate::timing::{CaptureClock, Ticks31};

/// Slot index ceiling, independent of table capacity
const MAX_SLOT_INDEX: u8 = 127;

/// Interrupt-side decoder state
pub struct PpmDecoder {
    params: InputParams,
    clock: CaptureClock,

    /// `None` while hunting for sync, else the channel slot being read
    slot: Option<u8>,

    /// Ticks since the last capture
    pulse_width: Ticks31,

    since_valid_frame: Ticks31,

    /// Channel count of the last completed frame
    channels_prev_frame: u8,

    noisy_channels: u8,

    frames: Saturating<u32>,
    errors: Saturating<u32>,
    commits: u32,

    /// Frame being assembled; never cleared, so each slot holds its last value
    provisional: [Micros; MAX_CHANNELS],
    committed: [Micros; MAX_CHANNELS],

    cell: Arc<FrameCell>,
}

impl PpmDecoder {
    pub fn new(params: InputParams) -> Self {
        Self {
            params,
            clock: CaptureClock::new(),
            slot: None,
            pulse_width: Ticks31::ZERO,
            since_valid_frame: Ticks31::ZERO,
            channels_prev_frame: 0,
            noisy_channels: 0,
            frames: Saturating(0),
            errors: Saturating(0),
            commits: 0,
            provisional: [0; MAX_CHANNELS],
            committed: [0; MAX_CHANNELS],
            cell: Arc::new(FrameCell::new()),
        }
    }

    /// Main-loop handle onto the committed frame
    pub fn monitor(&self) -> FrameMonitor {
        FrameMonitor {
            cell: Arc::clone(&self.cell),
            last_commit: 0,
        }
    }

    /// Handle one timer interrupt.
    pub fn on_timer_event(&mut self, event: &TimerEvent) {
        let ticks = self.clock.elapsed(event);
        self.pulse_width.add(ticks);
        self.since_valid_frame.add(ticks);

        let mut changed = false;

        if self.since_valid_frame.get() >= self.params.stale_frame_timeout_us && self.frames.0 > 0 {
            // link lost: report "no input" rather than stale values
            self.committed = [0; MAX_CHANNELS];
            self.frames = Saturating(0);
            self.errors = Saturating(0);
            changed = true;
        }

        if self.slot.is_none() || self.pulse_width.get() > self.params.max_channel_pulse_us {
            // hunting for sync, or this gap is too wide to be a channel
            if let Some(slot) = self.slot.take() {
                changed |= self.end_frame(slot);
            }
            if self.pulse_width.get() >= self.params.min_sync_pulse_us {
                self.noisy_channels = 0;
                self.slot = Some(0);
            }
        } else if event.capture {
            changed |= self.read_channel();
        }

        if event.capture {
            self.pulse_width.reset();
        }

        if changed {
            self.publish();
        }
    }

    /// Close the frame that had reached `slot`. Returns whether published state changed.
    fn end_frame(&mut self, slot: u8) -> bool {
        if slot == 0 {
            return false;
        }
        self.frames += 1;

        let prev = self.channels_prev_frame;
        let too_noisy = self.noisy_channels > self.params.max_noisy_channels;
        if prev > 0 && prev == slot && !too_noisy {
            self.committed = self.provisional;
            self.commits = self.commits.wrapping_add(1);
            self.since_valid_frame.reset();
        } else if (prev > 0 && prev != slot) || too_noisy {
            self.errors += 1;
        }

        self.channels_prev_frame = slot;
        true
    }

    /// Store the gap that just ended as the current channel. Returns whether
    /// published state changed.
    fn read_channel(&mut self) -> bool {
        let Some(slot) = self.slot else {
            return false;
        };
        let width = self.pulse_width.get();

        if width < self.params.min_channel_pulse_us {
            self.slot = None;
            self.errors += 1;
            return true;
        }

        if let Some(held) = self.provisional.get_mut(slot as usize) {
            // a big jump on the same slot usually means the count slipped
            if *held > 0 && held.abs_diff(width) >= self.params.jitter_threshold_us {
                self.noisy_channels = self.noisy_channels.saturating_add(1);
            }
            *held = width;
        }

        if slot < MAX_SLOT_INDEX {
            self.slot = Some(slot + 1);
        }
        false
    }

    fn publish(&self) {
        self.cell.publish(&FrameSnapshot {
            widths: self.committed,
            channels_detected: self.channels_prev_frame,
            frames: self.frames.0,
            errors: self.errors.0,
            commits: self.commits,
        });
    }

    pub fn frames(&self) -> u32 {
        self.frames.0
    }

    pub fn errors(&self) -> u32 {
        self.errors.0
    }

    /// True while waiting for a sync pulse
    pub fn is_hunting(&self) -> bool {
        self.slot.is_none()
    }
}

/// Main-loop reader of the decoder's committed frame
pub struct FrameMonitor {
    cell: Arc<FrameCell>,
    last_commit: u32,
}

impl FrameMonitor {
    /// Frame counter of a newly committed frame, reported once per commit.
    ///
    /// Nothing is reported until at least two frames were seen, since the
    /// first frame after sync can never be confirmed.
    pub fn new_frame_available(&mut self) -> Option<u32> {
        self.next_frame().map(|snapshot| snapshot.frames)
    }

    /// Like `new_frame_available`, but hands back the very snapshot that was
    /// checked, so the table always belongs to the reported commit.
    pub fn next_frame(&mut self) -> Option<FrameSnapshot> {
        let snapshot = self.cell.read();
        if snapshot.frames >= 2 && snapshot.commits != self.last_commit {
            self.last_commit = snapshot.commits;
            return Some(snapshot);
        }
        None
    }

    /// Committed width of `channel`
    pub fn channel_width(&self, channel: usize) -> Result<Micros, ChannelError> {
        let snapshot = self.cell.read();
        if channel >= MAX_CHANNELS || channel >= snapshot.channels_detected as usize {
            return Err(ChannelError::Unavailable { index: channel });
        }
        Ok(snapshot.widths[channel])
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        self.cell.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::CaptureSynth;

    const SYNC: u32 = 9_000;

    struct Bench {
        decoder: PpmDecoder,
        monitor: FrameMonitor,
        synth: CaptureSynth,
    }

    impl Bench {
        fn new() -> Self {
            Self::with_params(InputParams::default())
        }

        fn with_params(params: InputParams) -> Self {
            let decoder = PpmDecoder::new(params);
            let monitor = decoder.monitor();
            Self {
                decoder,
                monitor,
                synth: CaptureSynth::new(params.capture_period_ticks),
            }
        }

        fn gaps(&mut self, gaps: &[u32]) {
            for &gap in gaps {
                for event in self.synth.edge_after(gap) {
                    self.decoder.on_timer_event(&event);
                }
            }
        }

        fn frame(&mut self, channels: &[u32]) {
            self.gaps(&[SYNC]);
            self.gaps(channels);
        }

        fn idle(&mut self, ticks: u32) {
            for event in self.synth.idle(ticks) {
                self.decoder.on_timer_event(&event);
            }
        }
    }

    #[test]
    fn two_matching_frames_commit() {
        let mut bench = Bench::new();
        bench.frame(&[1000, 1500, 1200]);
        bench.frame(&[1000, 1500, 1200]);
        bench.gaps(&[SYNC]);

        let snapshot = bench.monitor.snapshot();
        assert_eq!(snapshot.table().as_slice(), &[1000, 1500, 1200]);
        assert_eq!(snapshot.frames, 2);
        assert_eq!(snapshot.errors, 0);
        assert_eq!(bench.monitor.channel_width(1), Ok(1500));
    }

    #[test]
    fn first_frame_alone_is_not_committed() {
        let mut bench = Bench::new();
        bench.frame(&[1000, 1500, 1200]);
        bench.gaps(&[SYNC]);

        let snapshot = bench.monitor.snapshot();
        assert_eq!(snapshot.frames, 1);
        assert_eq!(snapshot.commits, 0);
        assert_eq!(snapshot.widths, [0; MAX_CHANNELS]);
        assert_eq!(bench.monitor.channel_width(0), Ok(0));
    }

    #[test]
    fn channel_count_change_is_an_error() {
        let mut bench = Bench::new();
        for _ in 0..3 {
            bench.frame(&[1000, 1500, 1200]);
        }
        bench.frame(&[1100, 1600]);
        bench.gaps(&[SYNC]);

        let snapshot = bench.monitor.snapshot();
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.widths[..3], [1000, 1500, 1200]);
        assert_eq!(snapshot.channels_detected, 2);
    }

    #[test]
    fn runt_pulse_aborts_frame() {
        let mut bench = Bench::new();
        bench.frame(&[1000, 500]);

        assert!(bench.decoder.is_hunting());
        assert_eq!(bench.decoder.errors(), 1);
        assert_eq!(bench.monitor.snapshot().errors, 1);
    }

    #[test]
    fn jittery_frame_is_discarded() {
        let mut bench = Bench::new();
        bench.frame(&[1000, 1000, 1000, 1000]);
        bench.frame(&[1000, 1000, 1000, 1000]);
        // three channels jump by >= 600
        bench.frame(&[1700, 1700, 1700, 1000]);
        bench.gaps(&[SYNC]);

        let snapshot = bench.monitor.snapshot();
        assert_eq!(snapshot.frames, 3);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.table().as_slice(), &[1000, 1000, 1000, 1000]);
    }

    #[test]
    fn two_noisy_channels_are_tolerated() {
        let mut bench = Bench::new();
        bench.frame(&[1000, 1000, 1000]);
        bench.frame(&[1000, 1000, 1000]);
        bench.frame(&[1700, 1700, 1000]);
        bench.gaps(&[SYNC]);

        let snapshot = bench.monitor.snapshot();
        assert_eq!(snapshot.errors, 0);
        assert_eq!(snapshot.table().as_slice(), &[1700, 1700, 1000]);
    }

    #[test]
    fn noise_limit_is_configurable() {
        let params = InputParams {
            max_noisy_channels: 0,
            ..InputParams::default()
        };
        let mut bench = Bench::with_params(params);
        bench.frame(&[1000, 1000]);
        bench.frame(&[1000, 1000]);
        bench.frame(&[1700, 1000]);
        bench.gaps(&[SYNC]);

        assert_eq!(bench.monitor.snapshot().errors, 1);
        assert_eq!(bench.monitor.channel_width(0), Ok(1000));
    }

    #[test]
    fn silence_resets_committed_table_and_counters() {
        let mut bench = Bench::new();
        bench.frame(&[1000, 1500, 1200]);
        bench.frame(&[1000, 1500, 1200]);
        bench.gaps(&[SYNC]);
        assert_eq!(bench.monitor.channel_width(2), Ok(1200));

        // counted from the last overflow after the commit, so overshoot a little
        bench.idle(250_000);

        let snapshot = bench.monitor.snapshot();
        assert_eq!(snapshot.widths, [0; MAX_CHANNELS]);
        assert_eq!(snapshot.frames, 0);
        assert_eq!(snapshot.errors, 0);
    }

    #[test]
    fn new_frame_reported_once_per_commit() {
        let mut bench = Bench::new();
        bench.frame(&[1000, 1500]);
        bench.frame(&[1000, 1500]);
        assert_eq!(bench.monitor.new_frame_available(), None);

        bench.gaps(&[SYNC]);
        assert_eq!(bench.monitor.new_frame_available(), Some(2));
        assert_eq!(bench.monitor.new_frame_available(), None);

        bench.gaps(&[1000, 1500, SYNC]);
        assert_eq!(bench.monitor.new_frame_available(), Some(3));
        assert_eq!(bench.monitor.new_frame_available(), None);
    }

    #[test]
    fn fresh_commit_after_reset_is_reported() {
        let mut bench = Bench::new();
        bench.frame(&[1000, 1500]);
        bench.frame(&[1000, 1500]);
        bench.gaps(&[SYNC]);
        assert_eq!(bench.monitor.new_frame_available(), Some(2));

        bench.idle(250_000);
        assert_eq!(bench.monitor.new_frame_available(), None);

        bench.gaps(&[SYNC]);
        bench.gaps(&[1000, 1500, SYNC]);
        bench.gaps(&[1000, 1500, SYNC]);
        assert_eq!(bench.monitor.new_frame_available(), Some(2));
    }

    #[test]
    fn channels_beyond_capacity_are_counted_not_stored() {
        let mut bench = Bench::new();
        let wide = [1200; MAX_CHANNELS + 2];
        bench.frame(&wide);
        bench.frame(&wide);
        bench.gaps(&[SYNC]);

        let snapshot = bench.monitor.snapshot();
        assert_eq!(snapshot.channels_detected as usize, MAX_CHANNELS + 2);
        assert_eq!(snapshot.table().len(), MAX_CHANNELS);
        assert_eq!(
            bench.monitor.channel_width(MAX_CHANNELS),
            Err(ChannelError::Unavailable { index: MAX_CHANNELS })
        );
    }

    #[test]
    fn next_frame_returns_the_reported_commit() {
        let mut bench = Bench::new();
        bench.frame(&[1000, 1500]);
        bench.frame(&[1000, 1500]);
        bench.gaps(&[SYNC]);
        bench.gaps(&[1100, 1500, SYNC]);

        // two commits landed since the last look: only the latest is handed out
        let snapshot = bench.monitor.next_frame().expect("committed frame");
        assert_eq!(snapshot.frames, 3);
        assert_eq!(snapshot.table().as_slice(), &[1100, 1500]);
        assert!(bench.monitor.next_frame().is_none());
        assert_eq!(bench.monitor.new_frame_available(), None);
    }

    #[test]
    fn slot_index_stops_at_ceiling() {
        let mut bench = Bench::new();
        // 200 slots of 760 us stay well inside the stale-link timeout
        bench.frame(&[760; 200]);
        bench.gaps(&[SYNC]);

        let snapshot = bench.monitor.snapshot();
        assert_eq!(snapshot.channels_detected, MAX_SLOT_INDEX);
        assert_eq!(snapshot.frames, 1);
        assert_eq!(snapshot.errors, 0);
        assert!(!bench.decoder.is_hunting());
    }

    #[test]
    fn jitter_threshold_is_inclusive() {
        for (jump, expected_errors) in [(599, 0), (600, 1)] {
            let mut bench = Bench::new();
            bench.frame(&[1000, 1000, 1000]);
            bench.frame(&[1000, 1000, 1000]);
            bench.frame(&[1000 + jump; 3]);
            bench.gaps(&[SYNC]);

            let snapshot = bench.monitor.snapshot();
            assert_eq!(snapshot.errors, expected_errors, "jump {jump}");
            let expected_width = if expected_errors == 0 { 1000 + jump } else { 1000 };
            assert_eq!(bench.monitor.channel_width(0), Ok(expected_width), "jump {jump}");
        }
    }

    #[test]
    fn query_beyond_detected_channels_is_unavailable() {
        let mut bench = Bench::new();
        bench.frame(&[1000, 1500]);
        bench.frame(&[1000, 1500]);
        bench.gaps(&[SYNC]);
        assert_eq!(
            bench.monitor.channel_width(2),
            Err(ChannelError::Unavailable { index: 2 })
        );
    }

    #[test]
    fn long_sync_spanning_overflows_is_recognised() {
        let mut bench = Bench::new();
        // 30 ms sync crosses at least one counter wrap
        for _ in 0..3 {
            bench.gaps(&[30_000, 1000, 1500, 1200]);
        }
        bench.gaps(&[30_000]);

        let snapshot = bench.monitor.snapshot();
        assert_eq!(snapshot.errors, 0);
        assert_eq!(snapshot.table().as_slice(), &[1000, 1500, 1200]);
    }
}
