//! End-to-end dispatcher behavior over a scripted source and manual clock.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ledstream_core::{
    AddressableStrip, Clock, Color, DatagramSource, HYPERION_PORT, MemoryStrip, RealtimeEffect,
    ReceiverConfig, SourceError,
};

struct ScriptedSource {
    frames: VecDeque<Vec<u8>>,
}

impl ScriptedSource {
    fn new(frames: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl DatagramSource for ScriptedSource {
    fn open(_port: u16) -> Result<Self, SourceError> {
        Ok(Self {
            frames: VecDeque::new(),
        })
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, SourceError> {
        match self.frames.pop_front() {
            Some(frame) => {
                buf[..frame.len()].copy_from_slice(&frame);
                Ok(Some(frame.len()))
            }
            None => Ok(None),
        }
    }
}

#[derive(Clone)]
struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

fn effect_with(
    port: u16,
    frames: impl IntoIterator<Item = Vec<u8>>,
) -> (RealtimeEffect<ScriptedSource, ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let effect = RealtimeEffect::with_source(
        ReceiverConfig { port },
        clock.clone(),
        ScriptedSource::new(frames),
    );
    (effect, clock)
}

fn painted_strip(len: usize) -> MemoryStrip {
    let mut strip = MemoryStrip::new(len);
    for index in 0..len {
        strip.set(index, Color::rgb(90, 90, 90));
    }
    strip
}

#[test]
fn sub_header_datagrams_mutate_nothing() {
    for frame in [vec![], vec![1u8]] {
        let (mut effect, _clock) = effect_with(21_324, [frame]);
        let mut strip = painted_strip(4);
        let before = strip.pixels().to_vec();
        effect.tick(&mut strip);
        assert_eq!(strip.pixels(), &before[..]);
        assert_eq!(effect.stats().accepted, 0);
    }
}

#[test]
fn ragged_payloads_leave_buffer_unchanged() {
    // WARLS and DRGBW records are 4 bytes, DRGB records are 3.
    let ragged = [
        vec![1u8, 0, 5, 5, 5],
        vec![2u8, 0, 5, 5, 5, 5],
        vec![3u8, 0, 5, 5, 5],
    ];
    for frame in ragged {
        let (mut effect, _clock) = effect_with(21_324, [frame]);
        let mut strip = painted_strip(4);
        let before = strip.pixels().to_vec();
        effect.tick(&mut strip);
        assert_eq!(strip.pixels(), &before[..]);
        assert_eq!(effect.stats().rejected, 1);
    }
}

#[test]
fn drgb_sets_prefix_and_leaves_tail() {
    let (mut effect, _clock) =
        effect_with(21_324, [vec![2u8, 255, 1, 2, 3, 4, 5, 6]]);
    let mut strip = painted_strip(5);
    effect.tick(&mut strip);
    assert_eq!(strip.pixels()[0], Color::rgb(1, 2, 3));
    assert_eq!(strip.pixels()[1], Color::rgb(4, 5, 6));
    for index in 2..5 {
        assert_eq!(strip.pixels()[index], Color::rgb(90, 90, 90));
    }
}

#[test]
fn drgb_longer_than_strip_drops_excess() {
    // Three records against a two-pixel strip; the third is out of range.
    let (mut effect, _clock) =
        effect_with(21_324, [vec![2u8, 255, 1, 1, 1, 2, 2, 2, 3, 3, 3]]);
    let mut strip = MemoryStrip::new(2);
    effect.tick(&mut strip);
    assert_eq!(strip.pixels(), &[Color::rgb(1, 1, 1), Color::rgb(2, 2, 2)]);
    assert_eq!(effect.stats().accepted, 1);
}

#[test]
fn warls_skips_out_of_range_record_but_applies_the_rest() {
    let (mut effect, _clock) =
        effect_with(21_324, [vec![1u8, 255, 200, 255, 0, 0, 0, 10, 20, 30]]);
    let mut strip = MemoryStrip::new(5);
    effect.tick(&mut strip);
    assert_eq!(strip.pixels()[0], Color::rgb(10, 20, 30));
    for index in 1..5 {
        assert_eq!(strip.pixels()[index], Color::BLACK);
    }
    assert_eq!(effect.stats().accepted, 1);
}

#[test]
fn drgbw_carries_the_white_channel() {
    let (mut effect, _clock) =
        effect_with(21_324, [vec![3u8, 255, 1, 2, 3, 200]]);
    let mut strip = MemoryStrip::new(2);
    effect.tick(&mut strip);
    assert_eq!(strip.pixels()[0], Color::rgbw(1, 2, 3, 200));
}

#[test]
fn dnrgb_writes_from_the_wire_offset() {
    let (mut effect, _clock) = effect_with(
        21_324,
        [vec![4u8, 255, 0x00, 0x02, 10, 20, 30, 40, 50, 60]],
    );
    let mut strip = painted_strip(5);
    effect.tick(&mut strip);
    assert_eq!(strip.pixels()[2], Color::rgb(10, 20, 30));
    assert_eq!(strip.pixels()[3], Color::rgb(40, 50, 60));
    for index in [0usize, 1, 4] {
        assert_eq!(strip.pixels()[index], Color::rgb(90, 90, 90));
    }
}

#[test]
fn timeout_never_suppresses_blanking_indefinitely() {
    let (mut effect, clock) = effect_with(21_324, [vec![2u8, 255, 7, 7, 7]]);
    let mut strip = MemoryStrip::new(3);
    effect.tick(&mut strip);
    assert_eq!(strip.pixels()[0], Color::rgb(7, 7, 7));

    for _ in 0..48 {
        clock.advance(Duration::from_secs(3_600));
        effect.tick(&mut strip);
    }
    assert_eq!(effect.stats().blanks, 0);
    assert_eq!(strip.pixels()[0], Color::rgb(7, 7, 7));
}

#[test]
fn timeout_zero_blanks_once_after_a_second_of_silence() {
    let (mut effect, clock) = effect_with(21_324, [vec![2u8, 0, 7, 7, 7]]);
    let mut strip = MemoryStrip::new(3);
    effect.tick(&mut strip);
    let commits_after_frame = strip.commits();

    clock.advance(Duration::from_millis(999));
    effect.tick(&mut strip);
    assert_eq!(effect.stats().blanks, 0);

    clock.advance(Duration::from_millis(2));
    effect.tick(&mut strip);
    assert_eq!(effect.stats().blanks, 1);
    assert!(strip.pixels().iter().all(|&c| c == Color::BLACK));
    assert_eq!(strip.commits(), commits_after_frame + 1);

    // The deadline was pushed out by the default interval, so the blank
    // does not repeat on the next tick.
    clock.advance(Duration::from_millis(500));
    effect.tick(&mut strip);
    assert_eq!(effect.stats().blanks, 1);
}

#[test]
fn timeout_seconds_is_wire_unit_seconds() {
    let (mut effect, clock) = effect_with(21_324, [vec![2u8, 5, 7, 7, 7]]);
    let mut strip = MemoryStrip::new(3);
    effect.tick(&mut strip);

    clock.advance(Duration::from_millis(4_999));
    effect.tick(&mut strip);
    assert_eq!(effect.stats().blanks, 0);

    clock.advance(Duration::from_millis(2));
    effect.tick(&mut strip);
    assert_eq!(effect.stats().blanks, 1);
}

#[test]
fn redispatching_an_identical_frame_is_idempotent() {
    let frame = vec![1u8, 255, 0, 9, 8, 7, 2, 1, 2, 3];
    let (mut effect, _clock) = effect_with(21_324, [frame.clone(), frame]);
    let mut strip = MemoryStrip::new(4);
    effect.tick(&mut strip);
    let after_first = strip.pixels().to_vec();
    effect.tick(&mut strip);
    assert_eq!(strip.pixels(), &after_first[..]);
    assert_eq!(effect.stats().accepted, 2);
}

#[test]
fn rejected_frame_does_not_extend_the_deadline() {
    // An accepted 2s frame, then garbage right before the deadline: the
    // garbage must not count as liveness.
    let (mut effect, clock) = effect_with(
        21_324,
        [vec![2u8, 2, 7, 7, 7], vec![9u8, 255, 1, 2, 3]],
    );
    let mut strip = MemoryStrip::new(3);
    effect.tick(&mut strip);

    clock.advance(Duration::from_millis(1_999));
    effect.tick(&mut strip);
    assert_eq!(effect.stats().rejected, 1);
    assert_eq!(effect.stats().blanks, 0);

    clock.advance(Duration::from_millis(2));
    effect.tick(&mut strip);
    assert_eq!(effect.stats().blanks, 1);
}

#[test]
fn empty_notifier_updates_deadline_without_writing() {
    // Fail-safe deadline armed at start would blank after 1s; an accepted
    // notifier with a 10s timeout postpones it without touching pixels.
    let (mut effect, clock) = effect_with(21_324, [vec![0u8, 10]]);
    let mut strip = painted_strip(3);
    effect.tick(&mut strip);
    assert_eq!(effect.stats().accepted, 1);
    assert_eq!(effect.stats().notifier_frames, 1);
    assert_eq!(strip.pixels(), &vec![Color::rgb(90, 90, 90); 3][..]);

    clock.advance(Duration::from_secs(9));
    effect.tick(&mut strip);
    assert_eq!(effect.stats().blanks, 0);

    clock.advance(Duration::from_secs(1));
    effect.tick(&mut strip);
    assert_eq!(effect.stats().blanks, 1);
}

#[test]
fn non_empty_notifier_is_always_rejected() {
    let (mut effect, _clock) = effect_with(21_324, [vec![0u8, 10, 1]]);
    let mut strip = painted_strip(3);
    effect.tick(&mut strip);
    assert_eq!(effect.stats().rejected, 1);
    assert_eq!(effect.stats().accepted, 0);
}

#[test]
fn hyperion_port_treats_notifier_tag_as_drgb() {
    let (mut effect, _clock) =
        effect_with(HYPERION_PORT, [vec![0u8, 255, 10, 20, 30]]);
    let mut strip = MemoryStrip::new(3);
    effect.tick(&mut strip);
    assert_eq!(effect.stats().drgb_frames, 1);
    assert_eq!(strip.pixels()[0], Color::rgb(10, 20, 30));
}

#[test]
fn one_datagram_drained_per_tick() {
    let (mut effect, _clock) = effect_with(
        21_324,
        [vec![2u8, 255, 1, 1, 1], vec![2u8, 255, 2, 2, 2]],
    );
    let mut strip = MemoryStrip::new(1);
    effect.tick(&mut strip);
    assert_eq!(effect.stats().datagrams, 1);
    assert_eq!(strip.pixels()[0], Color::rgb(1, 1, 1));
    effect.tick(&mut strip);
    assert_eq!(effect.stats().datagrams, 2);
    assert_eq!(strip.pixels()[0], Color::rgb(2, 2, 2));
}
