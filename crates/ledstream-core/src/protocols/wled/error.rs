use thiserror::Error;

use super::parser::Variant;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("datagram too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("unknown protocol tag 0x{tag:02X}")]
    UnknownTag { tag: u8 },
    #[error("{variant} payload length {len} is not a multiple of {record_len}")]
    RaggedPayload {
        variant: Variant,
        len: usize,
        record_len: usize,
    },
    #[error("notifier payload must be empty, got {len} bytes")]
    NonEmptyNotifier { len: usize },
}
