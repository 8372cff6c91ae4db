//! Bit-packed frame header.
//!
//! Header layout (1 byte):
//!
//! ```text
//! +-----+-----+-----+-----+-----+-----+-----+-----+
//! |  7  |  6  |  5  |  4  |  3  |  2  |  1  |  0  |
//! +-----+-----+-----+-----+-----+-----+-----+-----+
//! |             length (6 bits)       | kind (2)  |
//! +-----------------------------------+-----------+
//! ```
//!
//! Packing is done with explicit masks and shifts. C-style bit-fields leave
//! bit ordering implementation-defined, so the wire layout is hand-rolled
//! here and nowhere else.

use crate::error::ProtocolError;
use crate::MAX_PAYLOAD_SIZE;

const KIND_MASK: u8 = 0x03;
const LENGTH_SHIFT: u8 = 2;

/// The three message kinds carried in the 2-bit header tag.
///
/// Tag value 3 is reserved and rejected on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Command sent to the device.
    Request = 0,
    /// Reply to a previously sent request.
    Response = 1,
    /// Unsolicited event pushed by the device.
    Notification = 2,
}

impl MessageKind {
    /// Returns the 2-bit wire tag for this kind.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parses a 2-bit wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, ProtocolError> {
        match tag & KIND_MASK {
            0 => Ok(MessageKind::Request),
            1 => Ok(MessageKind::Response),
            2 => Ok(MessageKind::Notification),
            other => Err(ProtocolError::UnknownMessageKind(other)),
        }
    }
}

/// Decoded frame header: message kind plus payload byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: MessageKind,
    /// Payload length in bytes (0..=63).
    pub length: u8,
}

impl Header {
    pub fn new(kind: MessageKind, length: u8) -> Self {
        Self { kind, length }
    }

    /// Packs the header into its single wire byte.
    ///
    /// Fails with `InvalidLength` if the length does not fit in 6 bits.
    pub fn encode(&self) -> Result<u8, ProtocolError> {
        if self.length as usize > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::InvalidLength(self.length));
        }
        Ok((self.length << LENGTH_SHIFT) | self.kind.tag())
    }

    /// Unpacks a header byte.
    ///
    /// Fails with `UnknownMessageKind` for the reserved tag value 3; any
    /// 6-bit length is valid.
    pub fn decode(byte: u8) -> Result<Self, ProtocolError> {
        let kind = MessageKind::from_tag(byte & KIND_MASK)?;
        Ok(Self {
            kind,
            length: byte >> LENGTH_SHIFT,
        })
    }
}
