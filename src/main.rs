//! ppm-loopback - both ends of the RC link on the host
//!
//! The TX unit decodes a synthetic receiver pulse train (a PPM encoder sweeping
//! its sticks, fed through the simulated capture timer) and forwards each
//! committed frame over a channel standing in for the radio. The RX unit
//! re-encodes every frame it receives.
//!
//!   RUST_LOG=debug cargo run --bin ppm-loopback -- [settings.json] [frames]

use std::error::Error;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};

use ppm_link_lib::adapters::{MockLink, SimTimer};
use ppm_link_lib::domain::{ChannelTable, LinkMode, LinkSettings, Micros, PpmError, PpmResult};
use ppm_link_lib::ppm::PpmEncoder;
use ppm_link_lib::PpmController;

/// Channels on the synthetic receiver
const SOURCE_CHANNELS: usize = 6;

const DEFAULT_FRAMES: u32 = 200;

/// Triangle sweep between 1100 and 1900 µs, phase-shifted per channel
fn stick_position(frame: u32, channel: usize) -> Micros {
    // one sweep is 200 frames; reduce first so long runs never overflow
    let phase = ((frame % 200) * 8 + channel as u32 * 200) % 1600;
    let offset = if phase > 800 { 1600 - phase } else { phase };
    1100 + offset
}

fn load_settings(path: Option<&String>) -> Result<LinkSettings, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(LinkSettings::default());
    };
    let json = std::fs::read_to_string(path)?;
    let settings: LinkSettings = serde_json::from_str(&json)?;
    settings.validate()?;
    log::info!("Loaded settings from {path}");
    Ok(settings)
}

fn run_tx_unit(settings: LinkSettings, frames: u32, link: Sender<ChannelTable>) -> PpmResult<u32> {
    let mut unit = PpmController::new(
        SimTimer::new(),
        MockLink::new(),
        settings.clone().with_mode(LinkMode::Decode),
    )?;
    unit.init_from_settings()?;

    let mut source = PpmEncoder::new(settings.output);
    let sticks = source.writer();
    let mut sent = 0;

    for frame in 0..frames {
        let positions: Vec<Micros> = (0..SOURCE_CHANNELS)
            .map(|channel| stick_position(frame, channel))
            .collect();
        sticks.set_channel_widths(&positions)?;

        for _ in 0..=SOURCE_CHANNELS {
            let gap = source.on_compare_match();
            unit.timer_mut().raise_edge_after(gap);
            while unit.timer().has_pending() {
                unit.on_timer_interrupt();
            }
        }

        if let Some(table) = unit.process() {
            if link.send(table).is_err() {
                return Err(PpmError::Link("RX unit hung up".into()));
            }
            sent += 1;
        }
    }

    let stats = unit.stats();
    log::info!(
        "TX unit: {} frames forwarded, decoder frames={} errors={}",
        sent,
        stats.frames,
        stats.errors
    );
    unit.deinit();
    Ok(sent)
}

fn run_rx_unit(settings: LinkSettings, link: Receiver<ChannelTable>) -> PpmResult<u32> {
    let mut unit = PpmController::new(
        SimTimer::new(),
        MockLink::new(),
        settings.with_mode(LinkMode::Encode),
    )?;
    unit.init_from_settings()?;
    let mut received = 0;

    for table in link.iter() {
        unit.set_channel_widths(table.as_slice())?;
        for _ in 0..=table.len() {
            unit.timer_mut().raise_compare();
            unit.on_timer_interrupt();
        }
        let periods = unit.timer_mut().take_periods();
        log::debug!("ppm_out: {periods:?}");
        received += 1;
    }

    log::info!("RX unit: {received} frames re-encoded");
    unit.deinit();
    Ok(received)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let settings = load_settings(args.get(1))?;
    let frames = match args.get(2) {
        Some(n) => n.parse()?,
        None => DEFAULT_FRAMES,
    };

    let (tx, rx) = bounded(16);

    let tx_unit = {
        let settings = settings.clone();
        thread::spawn(move || run_tx_unit(settings, frames, tx))
    };
    let rx_unit = thread::spawn(move || run_rx_unit(settings, rx));

    let sent = tx_unit.join().map_err(|_| "TX unit panicked")??;
    let received = rx_unit.join().map_err(|_| "RX unit panicked")??;
    log::info!("Loopback complete: {sent} sent, {received} received");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stick_sweep_stays_in_range_for_any_frame() {
        for frame in [0, 1, 100, 199, 200, 536_870_912, u32::MAX] {
            for channel in 0..SOURCE_CHANNELS {
                let width = stick_position(frame, channel);
                assert!((1100..=1900).contains(&width), "frame {frame} ch {channel}: {width}");
            }
        }
    }

    #[test]
    fn stick_sweep_repeats_every_200_frames() {
        assert_eq!(stick_position(7, 2), stick_position(207, 2));
        assert_eq!(stick_position(u32::MAX, 0), stick_position(u32::MAX % 200, 0));
    }
}
