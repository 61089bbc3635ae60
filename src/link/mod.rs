//! Control channel: single-byte commands in, one text line out per byte.

pub mod report;
pub mod transport;
