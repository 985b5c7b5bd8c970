use std::slice::ChunksExact;

use super::error::FrameError;
use super::layout;
use super::parser::Variant;

pub struct FrameReader<'a> {
    datagram: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub fn new(datagram: &'a [u8]) -> Self {
        Self { datagram }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), FrameError> {
        if self.datagram.len() < needed {
            return Err(FrameError::TooShort {
                needed,
                actual: self.datagram.len(),
            });
        }
        Ok(())
    }

    /// Split the datagram into (tag, timeout byte, payload).
    pub fn split_header(&self) -> Result<(u8, u8, &'a [u8]), FrameError> {
        self.require_len(layout::HEADER_LEN)?;
        Ok((
            self.datagram[layout::TAG_OFFSET],
            self.datagram[layout::TIMEOUT_OFFSET],
            &self.datagram[layout::HEADER_LEN..],
        ))
    }
}

/// Chunk a payload into fixed-size records, rejecting ragged lengths.
pub fn records(
    payload: &[u8],
    record_len: usize,
    variant: Variant,
) -> Result<ChunksExact<'_, u8>, FrameError> {
    let chunks = payload.chunks_exact(record_len);
    if !chunks.remainder().is_empty() {
        return Err(FrameError::RaggedPayload {
            variant,
            len: payload.len(),
            record_len,
        });
    }
    Ok(chunks)
}

/// Split a big-endian u16 pixel offset off the front of a payload.
pub fn split_offset_u16_be(payload: &[u8]) -> Result<(u16, &[u8]), FrameError> {
    if payload.len() < layout::DNRGB_OFFSET_LEN {
        return Err(FrameError::TooShort {
            needed: layout::DNRGB_OFFSET_LEN,
            actual: payload.len(),
        });
    }
    let offset = u16::from_be_bytes([payload[0], payload[1]]);
    Ok((offset, &payload[layout::DNRGB_OFFSET_LEN..]))
}
