//! Channel tables shared between interrupt and main-loop context
//!
//! Each cell has exactly one writer and one reader, and the two never run on
//! the same side of the interrupt boundary. Everything is built from atomics so
//! no locks are taken inside an interrupt handler.
//!
//! - `FrameCell`: interrupt writes, main loop reads. Sequence-locked; the
//!   reader retries if it raced a publish, the writer never waits.
//! - `TableCell`: main loop writes, interrupt reads. Also sequence-locked,
//!   but the interrupt side makes a single attempt and keeps its previous
//!   table if it raced a write.

use std::hint::spin_loop;
use std::sync::atomic::{fence, AtomicU32, AtomicUsize, Ordering};

use crate::domain::{ChannelTable, Micros, MAX_CHANNELS};

fn zeroed_widths() -> [AtomicU32; MAX_CHANNELS] {
    std::array::from_fn(|_| AtomicU32::new(0))
}

/// The decoder's published state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameSnapshot {
    /// Last committed channel widths (all zero after a stale-link reset)
    pub widths: [Micros; MAX_CHANNELS],
    /// Channel slots seen in the last completed frame, may exceed capacity
    pub channels_detected: u8,
    pub frames: u32,
    pub errors: u32,
    /// Bumped on every commit; only used for change detection
    pub commits: u32,
}

impl FrameSnapshot {
    /// Committed widths trimmed to the channels actually present
    pub fn table(&self) -> ChannelTable {
        ChannelTable::from_array(self.widths, self.channels_detected as usize)
    }
}

pub struct FrameCell {
    seq: AtomicU32,
    widths: [AtomicU32; MAX_CHANNELS],
    channels_detected: AtomicU32,
    frames: AtomicU32,
    errors: AtomicU32,
    commits: AtomicU32,
}

impl FrameCell {
    pub fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
            widths: zeroed_widths(),
            channels_detected: AtomicU32::new(0),
            frames: AtomicU32::new(0),
            errors: AtomicU32::new(0),
            commits: AtomicU32::new(0),
        }
    }

    /// Single writer only
    pub fn publish(&self, snapshot: &FrameSnapshot) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        for (slot, &width) in self.widths.iter().zip(snapshot.widths.iter()) {
            slot.store(width, Ordering::Relaxed);
        }
        self.channels_detected
            .store(snapshot.channels_detected as u32, Ordering::Relaxed);
        self.frames.store(snapshot.frames, Ordering::Relaxed);
        self.errors.store(snapshot.errors, Ordering::Relaxed);
        self.commits.store(snapshot.commits, Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    pub fn read(&self) -> FrameSnapshot {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                spin_loop();
                continue;
            }

            let mut snapshot = FrameSnapshot::default();
            for (width, slot) in snapshot.widths.iter_mut().zip(self.widths.iter()) {
                *width = slot.load(Ordering::Relaxed);
            }
            snapshot.channels_detected = self.channels_detected.load(Ordering::Relaxed) as u8;
            snapshot.frames = self.frames.load(Ordering::Relaxed);
            snapshot.errors = self.errors.load(Ordering::Relaxed);
            snapshot.commits = self.commits.load(Ordering::Relaxed);

            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return snapshot;
            }
        }
    }
}

impl Default for FrameCell {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TableCell {
    seq: AtomicU32,
    widths: [AtomicU32; MAX_CHANNELS],
    len: AtomicUsize,
}

impl TableCell {
    pub fn new(widths: &[Micros; MAX_CHANNELS], len: usize) -> Self {
        let cell = Self {
            seq: AtomicU32::new(0),
            widths: zeroed_widths(),
            len: AtomicUsize::new(0),
        };
        cell.write(widths, len);
        cell
    }

    /// Writers exclude each other by taking the sequence from even to odd.
    /// Never call from the interrupt handler that reads the cell.
    pub fn write(&self, widths: &[Micros; MAX_CHANNELS], len: usize) {
        let seq = loop {
            let seq = self.seq.load(Ordering::Relaxed);
            if seq & 1 == 0
                && self
                    .seq
                    .compare_exchange_weak(
                        seq,
                        seq.wrapping_add(1),
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                break seq;
            }
            spin_loop();
        };
        fence(Ordering::Release);

        for (slot, &width) in self.widths.iter().zip(widths.iter()) {
            slot.store(width, Ordering::Relaxed);
        }
        self.len.store(len.min(MAX_CHANNELS), Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Single attempt, for interrupt context. `None` if a write was in
    /// progress or landed mid-copy; the caller keeps the table it already has.
    pub fn try_read(&self) -> Option<([Micros; MAX_CHANNELS], usize)> {
        let before = self.seq.load(Ordering::Acquire);
        if before & 1 == 1 {
            return None;
        }

        let mut widths = [0; MAX_CHANNELS];
        for (width, slot) in widths.iter_mut().zip(self.widths.iter()) {
            *width = slot.load(Ordering::Relaxed);
        }
        let len = self.len.load(Ordering::Relaxed);

        fence(Ordering::Acquire);
        (self.seq.load(Ordering::Relaxed) == before).then_some((widths, len))
    }

    /// Full-capacity widths plus the number of channels in use. Retries
    /// until it gets a consistent copy, so main loop only.
    pub fn read(&self) -> ([Micros; MAX_CHANNELS], usize) {
        loop {
            if let Some(table) = self.try_read() {
                return table;
            }
            spin_loop();
        }
    }

    pub fn table(&self) -> ChannelTable {
        let (widths, len) = self.read();
        ChannelTable::from_array(widths, len)
    }
}
