//! Message variants: the three payload shapes a frame can carry.
//!
//! Variants are pure data. Their only behavior is serializing their body
//! bytes in wire order for the frame encoder; the checksum trailer is
//! appended by the encoder, not here.

use bytes::{BufMut, Bytes, BytesMut};

use crate::header::MessageKind;
use crate::RESERVED_LEN;

/// Notification event identifiers pushed by the device.
///
/// Event bytes outside the known set decode losslessly to `Unknown` so a
/// newer peripheral firmware cannot make decoding fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEvent {
    /// Pairing completed successfully.
    PairingOk,
    /// Pairing attempt timed out.
    PairingTimeout,
    /// Event id not known to this implementation.
    Unknown(u8),
}

impl NotifyEvent {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => NotifyEvent::PairingOk,
            0x01 => NotifyEvent::PairingTimeout,
            other => NotifyEvent::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            NotifyEvent::PairingOk => 0x00,
            NotifyEvent::PairingTimeout => 0x01,
            NotifyEvent::Unknown(byte) => byte,
        }
    }
}

/// Command sent to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Caller-assigned command identifier.
    pub id: u8,
    /// Sub-command within the request family.
    pub subtype: u8,
    pub payload: Bytes,
}

/// Reply to a previously sent request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Echo of the originating request id.
    pub id: u8,
    /// 0 on success, negative device error code otherwise.
    pub error: i8,
    pub payload: Bytes,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.error == 0
    }

    pub fn is_error(&self) -> bool {
        self.error < 0
    }
}

/// Unsolicited event pushed by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u8,
    pub event: NotifyEvent,
    pub payload: Bytes,
}

/// A decoded message body, dispatched by the header's kind tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

impl Message {
    /// Returns the header kind tag for this variant.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Request(_) => MessageKind::Request,
            Message::Response(_) => MessageKind::Response,
            Message::Notification(_) => MessageKind::Notification,
        }
    }

    /// Returns the variable-length payload of the variant.
    pub fn payload(&self) -> &Bytes {
        match self {
            Message::Request(r) => &r.payload,
            Message::Response(r) => &r.payload,
            Message::Notification(n) => &n.payload,
        }
    }

    /// Serializes the body bytes in wire order: fixed fields, payload,
    /// reserved trailer. The header byte and checksum are not included.
    pub(crate) fn write_body(&self, buf: &mut BytesMut) {
        match self {
            Message::Request(r) => {
                buf.put_u8(r.id);
                buf.put_u8(r.subtype);
                buf.put_slice(&r.payload);
            }
            Message::Response(r) => {
                buf.put_u8(r.id);
                buf.put_i8(r.error);
                buf.put_slice(&r.payload);
            }
            Message::Notification(n) => {
                buf.put_u8(n.id);
                buf.put_u8(n.event.as_byte());
                buf.put_slice(&n.payload);
            }
        }
        buf.put_bytes(0, RESERVED_LEN);
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Message::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

impl From<Notification> for Message {
    fn from(notification: Notification) -> Self {
        Message::Notification(notification)
    }
}
