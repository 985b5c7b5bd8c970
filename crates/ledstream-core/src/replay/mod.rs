//! Offline replay of captured realtime LED traffic.
//!
//! A capture file stands in for the live socket: every UDP payload addressed
//! to the configured port is fed through the same dispatcher used online,
//! with a clock driven by capture timestamps so the blank-on-timeout policy
//! replays the way it would have run live.

mod pcap;
mod udp;

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::clock::Clock;
use crate::effect::{RealtimeEffect, ReceiverConfig};
use crate::source::UdpDatagramSource;
use crate::strip::MemoryStrip;
use crate::{CaptureWindow, DEFAULT_GENERATED_AT, InputInfo, ReplayReport, ToolInfo};

use pcap::CaptureReader;
use udp::datagram_for_port;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture parse error ({context}): {message}")]
    Capture {
        context: &'static str,
        message: String,
    },
}

/// Replay parameters: the port the receiver would have listened on and the
/// strip length to decode against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    pub port: u16,
    pub leds: usize,
}

/// Clock slaved to capture timestamps.
#[derive(Clone)]
struct CaptureClock {
    now: Rc<Cell<Instant>>,
}

impl CaptureClock {
    fn new(base: Instant) -> Self {
        Self {
            now: Rc::new(Cell::new(base)),
        }
    }

    fn set(&self, instant: Instant) {
        self.now.set(instant);
    }
}

impl Clock for CaptureClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Replay a capture file and report what the receiver would have done.
pub fn replay_capture(path: &Path, config: &ReplayConfig) -> Result<ReplayReport, ReplayError> {
    let mut reader = CaptureReader::open(path)?;

    let base = Instant::now();
    let clock = CaptureClock::new(base);
    let mut effect = RealtimeEffect::<UdpDatagramSource, _>::with_clock(
        ReceiverConfig { port: config.port },
        clock.clone(),
    );
    // Datagrams are fed in directly, so the socket is never opened; start
    // still arms the fail-safe deadline at the capture epoch.
    effect.start();
    let mut strip = MemoryStrip::new(config.leds);

    let mut packets_total = 0u64;
    let mut epoch = None;
    let mut last_ts = None;

    while let Some(packet) = reader.next_packet()? {
        packets_total += 1;
        if let Some(ts) = packet.ts {
            let first = *epoch.get_or_insert(ts);
            last_ts = Some(last_ts.map_or(ts, |last: f64| last.max(ts)));
            let offset = (ts - first).max(0.0);
            clock.set(base + Duration::from_secs_f64(offset));
        }
        if let Some(datagram) = datagram_for_port(packet.linktype, &packet.data, config.port) {
            effect.apply_datagram(datagram, &mut strip);
        }
        effect.blank_if_due(&mut strip);
    }

    let report = ReplayReport {
        report_version: crate::REPORT_VERSION,
        tool: ToolInfo {
            name: "ledstream".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: ts_to_rfc3339(last_ts.or(epoch))
            .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string()),
        input: InputInfo {
            path: path.display().to_string(),
            bytes: path.metadata()?.len(),
        },
        capture: CaptureWindow {
            packets_total,
            time_start: ts_to_rfc3339(epoch),
            time_end: ts_to_rfc3339(last_ts),
        },
        stats: effect.stats().clone(),
        pixels: strip.pixels().to_vec(),
    };
    Ok(report)
}

fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}
