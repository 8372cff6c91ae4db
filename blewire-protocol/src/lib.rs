//! # blewire-protocol
//!
//! Wire protocol implementation for blewire, a command protocol for small
//! BLE peripherals.
//!
//! This crate provides:
//! - Bit-packed single-byte headers (2-bit message kind + 6-bit length)
//! - Request/Response/Notification message variants
//! - 8-bit additive checksum computation and validation
//! - Frame encoding and decoding with typed error reporting
//!
//! Everything here is pure and synchronous; delivery of frames to and from
//! a device lives in `blewire-client`.

pub mod checksum;
pub mod error;
pub mod frame;
pub mod header;
pub mod message;

pub use checksum::checksum;
pub use error::ProtocolError;
pub use frame::{Frame, FIXED_FRAME_OVERHEAD, MAX_FRAME_SIZE, MIN_FRAME_SIZE};
pub use header::{Header, MessageKind};
pub use message::{Message, Notification, NotifyEvent, Request, Response};

/// Maximum payload size in bytes, bounded by the 6-bit header length field.
pub const MAX_PAYLOAD_SIZE: usize = 63;

/// Number of reserved trailer bytes carried by every message body.
pub const RESERVED_LEN: usize = 4;

/// Highest command id; the next id after this wraps back to 0.
pub const MSG_ID_MAX: u8 = 0x3F;
