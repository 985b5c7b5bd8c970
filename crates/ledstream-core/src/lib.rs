//! Ledstream core library for realtime LED control over UDP.
//!
//! This crate implements the receiver used by the CLI: a non-blocking
//! datagram source feeds the effect layer, which drives the protocol
//! decoders (layout/reader/parser) and applies decoded colors to an
//! addressable strip, blanking it when the sender goes quiet. Parsing is
//! byte-oriented and side-effect free; all I/O is isolated in `source` and
//! `replay`. Protocol conventions are captured in readers so parsers stay
//! minimal and consistent with the wire format.
//!
//! Invariants:
//! - A decoder validates a frame structurally before any pixel is written;
//!   malformed frames mutate nothing.
//! - No pixel index at or beyond the strip length is ever written;
//!   out-of-range records are skipped, not errors.
//! - The blank deadline is recomputed from scratch by every accepted frame
//!   and consulted once per tick, traffic or not.
//!
//! # Examples
//! ```no_run
//! use ledstream_core::{MemoryStrip, RealtimeEffect, ReceiverConfig, UdpDatagramSource};
//!
//! let mut strip = MemoryStrip::new(30);
//! let mut effect = RealtimeEffect::<UdpDatagramSource>::new(ReceiverConfig::default());
//! effect.start();
//! loop {
//!     effect.tick(&mut strip);
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! ```

use serde::{Deserialize, Serialize};

mod clock;
mod effect;
mod protocols;
mod replay;
mod source;
mod strip;
mod timer;

pub use clock::{Clock, MonotonicClock};
pub use effect::{EffectState, RealtimeEffect, ReceiverConfig, SessionStats};
pub use protocols::wled::layout::{DEFAULT_PORT, HYPERION_PORT};
pub use replay::{ReplayConfig, ReplayError, replay_capture};
pub use source::{DatagramSource, SourceError, UdpDatagramSource};
pub use strip::{AddressableStrip, Color, MemoryStrip};

/// Current replay report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no capture time is available.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Replay outcome with deterministic contents for a given capture.
///
/// # Examples
/// ```
/// use ledstream_core::{ReplayReport, SessionStats, ToolInfo, InputInfo, CaptureWindow};
///
/// let report = ReplayReport {
///     report_version: ledstream_core::REPORT_VERSION,
///     tool: ToolInfo {
///         name: "ledstream".to_string(),
///         version: "0.1.0".to_string(),
///     },
///     generated_at: ledstream_core::DEFAULT_GENERATED_AT.to_string(),
///     input: InputInfo {
///         path: "capture.pcapng".to_string(),
///         bytes: 0,
///     },
///     capture: CaptureWindow {
///         packets_total: 0,
///         time_start: None,
///         time_end: None,
///     },
///     stats: SessionStats::default(),
///     pixels: Vec::new(),
/// };
/// assert_eq!(report.report_version, ledstream_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// RFC3339 timestamp representing the report generation time.
    pub generated_at: String,
    /// Input capture metadata.
    pub input: InputInfo,
    /// Capture packet count and time bounds.
    pub capture: CaptureWindow,
    /// Dispatcher counters accumulated over the replay.
    pub stats: SessionStats,
    /// Final strip state after the last packet.
    pub pixels: Vec<Color>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name (e.g., "ledstream").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input capture metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the replayer.
    pub path: String,
    /// Input size in bytes.
    pub bytes: u64,
}

/// Basic capture summary (timestamps may be absent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureWindow {
    /// Total packet count observed in the capture.
    pub packets_total: u64,
    /// RFC3339 timestamp of the first packet (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 timestamp of the last packet (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_omits_absent_time_bounds() {
        let report = ReplayReport {
            report_version: REPORT_VERSION,
            tool: ToolInfo {
                name: "ledstream".to_string(),
                version: "0.1.0".to_string(),
            },
            generated_at: DEFAULT_GENERATED_AT.to_string(),
            input: InputInfo {
                path: "capture.pcapng".to_string(),
                bytes: 1,
            },
            capture: CaptureWindow {
                packets_total: 1,
                time_start: None,
                time_end: None,
            },
            stats: SessionStats::default(),
            pixels: vec![Color::BLACK],
        };

        let value = serde_json::to_value(&report).expect("report json");
        let capture = value.get("capture").expect("capture");
        assert!(capture.get("time_start").is_none());
        assert!(capture.get("time_end").is_none());
        assert_eq!(value["pixels"][0]["r"], 0);
    }
}
