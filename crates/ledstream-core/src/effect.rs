use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, MonotonicClock};
use crate::protocols::wled::{self, FramePayload, PixelWrite, Variant, layout};
use crate::source::DatagramSource;
use crate::strip::{AddressableStrip, Color};
use crate::timer::{BlankDeadline, DEFAULT_BLANK_INTERVAL};

/// Receiver construction parameters, supplied once by the setup layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverConfig {
    pub port: u16,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            port: layout::DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Stopped,
    /// Started but the socket has not been opened yet.
    Starting,
    Running,
    /// The socket could not be opened; surfaced once, not retried.
    Failed,
}

/// Counters maintained by the dispatcher, reported per session.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub ticks: u64,
    pub datagrams: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub blanks: u64,
    pub notifier_frames: u64,
    pub warls_frames: u64,
    pub drgb_frames: u64,
    pub drgbw_frames: u64,
    pub dnrgb_frames: u64,
}

impl SessionStats {
    fn record_accept(&mut self, variant: Variant) {
        self.accepted += 1;
        match variant {
            Variant::Notifier => self.notifier_frames += 1,
            Variant::Warls => self.warls_frames += 1,
            Variant::Drgb => self.drgb_frames += 1,
            Variant::Drgbw => self.drgbw_frames += 1,
            Variant::Dnrgb => self.dnrgb_frames += 1,
        }
    }
}

/// Realtime LED effect: drains one datagram per tick, decodes it, and
/// enforces blank-on-timeout so a vanished sender cannot leave stale colors
/// on the strip.
///
/// Single-threaded by construction: each [`tick`](Self::tick) runs to
/// completion without blocking, bounded by the size of one datagram.
pub struct RealtimeEffect<S: DatagramSource, C: Clock = MonotonicClock> {
    config: ReceiverConfig,
    clock: C,
    state: EffectState,
    source: Option<S>,
    blank_at: BlankDeadline,
    stats: SessionStats,
}

impl<S: DatagramSource> RealtimeEffect<S, MonotonicClock> {
    pub fn new(config: ReceiverConfig) -> Self {
        Self::with_clock(config, MonotonicClock)
    }
}

impl<S: DatagramSource, C: Clock> RealtimeEffect<S, C> {
    pub fn with_clock(config: ReceiverConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            state: EffectState::Stopped,
            source: None,
            blank_at: BlankDeadline::Never,
            stats: SessionStats::default(),
        }
    }

    /// Construct an already-running effect around an existing source,
    /// bypassing the lazy open.
    pub fn with_source(config: ReceiverConfig, clock: C, source: S) -> Self {
        let mut effect = Self::with_clock(config, clock);
        effect.source = Some(source);
        effect.state = EffectState::Running;
        effect.blank_at = BlankDeadline::At(effect.clock.now());
        effect
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Begin a session. The deadline is reset to "now" so a strip with no
    /// sender blanks on the next tick rather than holding stale colors.
    pub fn start(&mut self) {
        self.state = EffectState::Starting;
        self.blank_at = BlankDeadline::At(self.clock.now());
    }

    /// End the session and release the socket. A later `start` re-opens it.
    pub fn stop(&mut self) {
        self.source = None;
        self.state = EffectState::Stopped;
    }

    /// One scheduling tick: at most one receive, at most one decode, then
    /// the blank check. Decode runs fully before the check so an accepted
    /// frame's fresh deadline is the one consulted.
    pub fn tick<B: AddressableStrip>(&mut self, strip: &mut B) {
        match self.state {
            EffectState::Stopped | EffectState::Failed => return,
            EffectState::Starting => match S::open(self.config.port) {
                Ok(source) => {
                    self.source = Some(source);
                    self.state = EffectState::Running;
                }
                Err(err) => {
                    warn!("effect disabled: {err}");
                    self.state = EffectState::Failed;
                    return;
                }
            },
            EffectState::Running => {}
        }
        self.stats.ticks += 1;

        let mut buf = [0u8; layout::MAX_DATAGRAM_LEN];
        let received = match self.source.as_mut() {
            Some(source) => match source.try_recv(&mut buf) {
                Ok(received) => received,
                Err(err) => {
                    // Mid-stream receive trouble is not fatal; recovery is
                    // the lifecycle owner's call, not ours.
                    warn!("receive failed: {err}");
                    None
                }
            },
            None => None,
        };
        if let Some(len) = received {
            self.apply_datagram(&buf[..len], strip);
        }

        self.blank_if_due(strip);
    }

    /// Decode one datagram and apply it to the strip. Returns whether the
    /// frame was accepted. Malformed input mutates nothing and leaves the
    /// blank deadline untouched.
    pub fn apply_datagram<B: AddressableStrip>(&mut self, datagram: &[u8], strip: &mut B) -> bool {
        self.stats.datagrams += 1;
        if datagram.len() < layout::HEADER_LEN {
            // Too short to carry a header; dropped without ceremony.
            self.stats.rejected += 1;
            return false;
        }
        let frame = match wled::parse_frame(datagram, self.config.port) {
            Ok(frame) => frame,
            Err(err) => {
                debug!("frame rejected: {err}");
                self.stats.rejected += 1;
                return false;
            }
        };

        match &frame.payload {
            FramePayload::Notifier => {}
            FramePayload::Warls(payload) => apply_writes(strip, payload.writes()),
            FramePayload::Drgb(payload) => apply_writes(strip, payload.writes()),
            FramePayload::Drgbw(payload) => apply_writes(strip, payload.writes()),
            FramePayload::Dnrgb(payload) => apply_writes(strip, payload.writes()),
        }

        self.stats.record_accept(frame.variant());
        self.blank_at = BlankDeadline::arm(self.clock.now(), frame.timeout);
        strip.commit();
        true
    }

    /// Blank the whole strip if the deadline has passed, then push the
    /// deadline out by the default interval so blanking does not repeat
    /// every tick. Returns whether a blank happened.
    pub fn blank_if_due<B: AddressableStrip>(&mut self, strip: &mut B) -> bool {
        let now = self.clock.now();
        if !self.blank_at.is_due(now) {
            return false;
        }
        for index in 0..strip.len() {
            strip.set(index, Color::BLACK);
        }
        strip.commit();
        self.stats.blanks += 1;
        self.blank_at = BlankDeadline::At(now + DEFAULT_BLANK_INTERVAL);
        true
    }
}

/// Write decoded records, skipping any whose target lies beyond the strip.
/// The strip length is read per frame, never cached across calls.
fn apply_writes<B: AddressableStrip>(strip: &mut B, writes: impl Iterator<Item = PixelWrite>) {
    let max_leds = strip.len();
    for write in writes {
        if write.index < max_leds {
            strip.set(write.index, write.color);
        }
    }
}
