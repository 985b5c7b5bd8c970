use crate::strip::Color;

use super::error::FrameError;
use super::layout;
use super::reader::{FrameReader, records, split_offset_u16_be};

/// Wire sub-formats, keyed by the leading tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Notifier,
    Warls,
    Drgb,
    Drgbw,
    Dnrgb,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Variant::Notifier => "notifier",
            Variant::Warls => "WARLS",
            Variant::Drgb => "DRGB",
            Variant::Drgbw => "DRGBW",
            Variant::Dnrgb => "DNRGB",
        };
        f.write_str(name)
    }
}

/// Blank timeout requested by a frame's second header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Byte 0: fall back to the receiver's default interval.
    Default,
    /// Bytes 1..=254: whole seconds.
    Seconds(u8),
    /// Byte 255: suppress blanking until the next frame.
    Never,
}

impl Timeout {
    pub fn from_wire(raw: u8) -> Self {
        match raw {
            0 => Timeout::Default,
            layout::TIMEOUT_NEVER => Timeout::Never,
            seconds => Timeout::Seconds(seconds),
        }
    }
}

/// One pixel mutation decoded from a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWrite {
    pub index: usize,
    pub color: Color,
}

/// A structurally valid datagram: timeout plus one decoded sub-format.
#[derive(Debug)]
pub struct Frame<'a> {
    pub timeout: Timeout,
    pub payload: FramePayload<'a>,
}

#[derive(Debug)]
pub enum FramePayload<'a> {
    Notifier,
    Warls(WarlsPayload<'a>),
    Drgb(DrgbPayload<'a>),
    Drgbw(DrgbwPayload<'a>),
    Dnrgb(DnrgbPayload<'a>),
}

impl Frame<'_> {
    pub fn variant(&self) -> Variant {
        match self.payload {
            FramePayload::Notifier => Variant::Notifier,
            FramePayload::Warls(_) => Variant::Warls,
            FramePayload::Drgb(_) => Variant::Drgb,
            FramePayload::Drgbw(_) => Variant::Drgbw,
            FramePayload::Dnrgb(_) => Variant::Dnrgb,
        }
    }
}

/// `[index, r, g, b]` records with an explicit pixel index each.
#[derive(Debug)]
pub struct WarlsPayload<'a> {
    records: &'a [u8],
}

impl WarlsPayload<'_> {
    pub fn writes(&self) -> impl Iterator<Item = PixelWrite> + '_ {
        self.records
            .chunks_exact(layout::WARLS_RECORD_LEN)
            .map(|record| PixelWrite {
                index: record[0] as usize,
                color: Color::rgb(record[1], record[2], record[3]),
            })
    }
}

/// `[r, g, b]` records addressing pixels sequentially from 0.
#[derive(Debug)]
pub struct DrgbPayload<'a> {
    records: &'a [u8],
}

impl DrgbPayload<'_> {
    pub fn writes(&self) -> impl Iterator<Item = PixelWrite> + '_ {
        self.records
            .chunks_exact(layout::DRGB_RECORD_LEN)
            .enumerate()
            .map(|(index, record)| PixelWrite {
                index,
                color: Color::rgb(record[0], record[1], record[2]),
            })
    }
}

/// `[r, g, b, w]` records addressing pixels sequentially from 0.
#[derive(Debug)]
pub struct DrgbwPayload<'a> {
    records: &'a [u8],
}

impl DrgbwPayload<'_> {
    pub fn writes(&self) -> impl Iterator<Item = PixelWrite> + '_ {
        self.records
            .chunks_exact(layout::DRGBW_RECORD_LEN)
            .enumerate()
            .map(|(index, record)| PixelWrite {
                index,
                color: Color::rgbw(record[0], record[1], record[2], record[3]),
            })
    }
}

/// 16-bit big-endian start offset, then `[r, g, b]` records from there.
#[derive(Debug)]
pub struct DnrgbPayload<'a> {
    start: u16,
    records: &'a [u8],
}

impl DnrgbPayload<'_> {
    pub fn writes(&self) -> impl Iterator<Item = PixelWrite> + '_ {
        let start = self.start as usize;
        self.records
            .chunks_exact(layout::DNRGB_RECORD_LEN)
            .enumerate()
            .map(move |(i, record)| PixelWrite {
                index: start + i,
                color: Color::rgb(record[0], record[1], record[2]),
            })
    }
}

/// Decode one datagram into a [`Frame`].
///
/// Validation is all-or-nothing: a ragged payload or truncated header yields
/// an error and no frame, never a partially decoded one. `local_port` selects
/// the Hyperion compatibility aliasing of tag 0.
pub fn parse_frame(datagram: &[u8], local_port: u16) -> Result<Frame<'_>, FrameError> {
    let reader = FrameReader::new(datagram);
    let (tag, timeout_raw, payload) = reader.split_header()?;

    // Hyperion senders address the device on a fixed port and reuse the
    // notifier tag for DRGB data. Applied before decoder selection.
    let tag = if tag == layout::TAG_NOTIFIER && local_port == layout::HYPERION_PORT {
        layout::TAG_DRGB
    } else {
        tag
    };

    let payload = match tag {
        layout::TAG_NOTIFIER => {
            if !payload.is_empty() {
                return Err(FrameError::NonEmptyNotifier { len: payload.len() });
            }
            FramePayload::Notifier
        }
        layout::TAG_WARLS => {
            records(payload, layout::WARLS_RECORD_LEN, Variant::Warls)?;
            FramePayload::Warls(WarlsPayload { records: payload })
        }
        layout::TAG_DRGB => {
            records(payload, layout::DRGB_RECORD_LEN, Variant::Drgb)?;
            FramePayload::Drgb(DrgbPayload { records: payload })
        }
        layout::TAG_DRGBW => {
            records(payload, layout::DRGBW_RECORD_LEN, Variant::Drgbw)?;
            FramePayload::Drgbw(DrgbwPayload { records: payload })
        }
        layout::TAG_DNRGB => {
            let (start, rest) = split_offset_u16_be(payload)?;
            records(rest, layout::DNRGB_RECORD_LEN, Variant::Dnrgb)?;
            FramePayload::Dnrgb(DnrgbPayload {
                start,
                records: rest,
            })
        }
        tag => return Err(FrameError::UnknownTag { tag }),
    };

    Ok(Frame {
        timeout: Timeout::from_wire(timeout_raw),
        payload,
    })
}
