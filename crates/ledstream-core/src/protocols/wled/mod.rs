pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::FrameError;
pub use parser::{Frame, FramePayload, PixelWrite, Timeout, Variant, parse_frame};
