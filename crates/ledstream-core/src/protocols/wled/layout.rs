pub const HEADER_LEN: usize = 2;
pub const TAG_OFFSET: usize = 0;
pub const TIMEOUT_OFFSET: usize = 1;

pub const TAG_NOTIFIER: u8 = 0;
pub const TAG_WARLS: u8 = 1;
pub const TAG_DRGB: u8 = 2;
pub const TAG_DRGBW: u8 = 3;
pub const TAG_DNRGB: u8 = 4;

pub const WARLS_RECORD_LEN: usize = 4;
pub const DRGB_RECORD_LEN: usize = 3;
pub const DRGBW_RECORD_LEN: usize = 4;
pub const DNRGB_OFFSET_LEN: usize = 2;
pub const DNRGB_RECORD_LEN: usize = 3;

pub const TIMEOUT_NEVER: u8 = u8::MAX;

/// Default WLED realtime port.
pub const DEFAULT_PORT: u16 = 21324;
/// Hyperion senders reuse tag 0 as DRGB on this port.
pub const HYPERION_PORT: u16 = 19446;

/// Practical MTU payload ceiling for one datagram.
pub const MAX_DATAGRAM_LEN: usize = 1460;
