//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: tag values, record sizes, and offsets (source of truth)
//! - `reader`: safe byte access and framing conventions
//! - `parser`: domain-level decoding (no direct byte indexing)
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O; sources and the effect layer handle
//! sockets and strip mutation.

pub mod wled;
