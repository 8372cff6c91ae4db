//! Frame encoding and decoding.
//!
//! Frame layout (header byte + variant body + checksum trailer):
//!
//! ```text
//! +--------+--------+---------------+-------------+----------+----------+
//! | header | id     | subtype/error | payload     | reserved | checksum |
//! |        |        | /event        |             |          |          |
//! | 1 byte | 1 byte | 1 byte        | 0..63 bytes | 4 bytes  | 1 byte   |
//! +--------+--------+---------------+-------------+----------+----------+
//! ```
//!
//! The second fixed byte is `subtype` for requests, `error` for responses
//! and `event` for notifications. The checksum is the mod-256 sum of every
//! preceding byte. One buffer is one frame: transport packet boundaries
//! delimit frames, so the decoder is a pure function with no resync state.

use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::checksum;
use crate::error::ProtocolError;
use crate::header::{Header, MessageKind};
use crate::message::{Message, Notification, NotifyEvent, Request, Response};
use crate::{MAX_PAYLOAD_SIZE, RESERVED_LEN};

/// Bytes every frame carries besides the payload: header, two fixed body
/// bytes, reserved trailer, checksum.
pub const FIXED_FRAME_OVERHEAD: usize = 1 + 2 + RESERVED_LEN + 1;

/// Smallest possible frame (empty payload).
pub const MIN_FRAME_SIZE: usize = FIXED_FRAME_OVERHEAD;

/// Largest possible frame (63-byte payload).
pub const MAX_FRAME_SIZE: usize = FIXED_FRAME_OVERHEAD + MAX_PAYLOAD_SIZE;

/// Offset of the first payload byte within a frame.
const PAYLOAD_OFFSET: usize = 3;

/// A decoded and checksum-validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub message: Message,
    /// Checksum byte as received on the wire.
    pub checksum: u8,
}

impl Frame {
    /// Returns the message kind carried in the header.
    pub fn kind(&self) -> MessageKind {
        self.header.kind
    }

    /// Encodes a message into a complete outgoing frame.
    ///
    /// Fails with `PayloadTooLarge` if the payload exceeds the 6-bit length
    /// field; otherwise never fails.
    pub fn encode(message: &Message) -> Result<BytesMut, ProtocolError> {
        let payload_len = message.payload().len();
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let header = Header::new(message.kind(), payload_len as u8);
        let mut buf = BytesMut::with_capacity(FIXED_FRAME_OVERHEAD + payload_len);
        buf.put_u8(header.encode()?);
        message.write_body(&mut buf);

        let sum = checksum(&buf);
        buf.put_u8(sum);

        Ok(buf)
    }

    /// Decodes and validates a complete received frame.
    ///
    /// The header's kind tag selects the variant parser. A `ChecksumMismatch`
    /// is reported, not fatal: the caller decides whether to discard the
    /// frame or re-issue the request.
    pub fn decode(buf: &[u8]) -> Result<Frame, ProtocolError> {
        if buf.len() < MIN_FRAME_SIZE {
            return Err(ProtocolError::TruncatedFrame {
                size: buf.len(),
                min: MIN_FRAME_SIZE,
            });
        }

        let header = Header::decode(buf[0])?;

        let payload_len = buf.len() - FIXED_FRAME_OVERHEAD;
        if header.length as usize != payload_len {
            return Err(ProtocolError::LengthMismatch {
                declared: header.length,
                actual: payload_len,
            });
        }

        let body_end = buf.len() - 1;
        let received = buf[body_end];
        let computed = checksum(&buf[..body_end]);
        if received != computed {
            return Err(ProtocolError::ChecksumMismatch {
                expected: received,
                actual: computed,
            });
        }

        let payload = Bytes::copy_from_slice(&buf[PAYLOAD_OFFSET..PAYLOAD_OFFSET + payload_len]);
        let message = match header.kind {
            MessageKind::Request => Message::Request(Request {
                id: buf[1],
                subtype: buf[2],
                payload,
            }),
            MessageKind::Response => Message::Response(Response {
                id: buf[1],
                error: buf[2] as i8,
                payload,
            }),
            MessageKind::Notification => Message::Notification(Notification {
                id: buf[1],
                event: NotifyEvent::from_byte(buf[2]),
                payload,
            }),
        };

        Ok(Frame {
            header,
            message,
            checksum: received,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(id: u8, subtype: u8, payload: &'static [u8]) -> Message {
        Message::Request(Request {
            id,
            subtype,
            payload: Bytes::from_static(payload),
        })
    }

    #[test]
    fn test_request_wire_layout() {
        // 1 header + 1 id + 1 subtype + 8 payload + 4 reserved + 1 checksum
        let encoded = Frame::encode(&request(1, 0, b"BP123456")).unwrap();

        assert_eq!(
            &encoded[..],
            &[
                0x20, 0x01, 0x00, 0x42, 0x50, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x00, 0x00,
                0x00, 0x00, 0xE8
            ]
        );

        let frame = Frame::decode(&encoded).unwrap();
        assert_eq!(frame.kind(), MessageKind::Request);
        assert_eq!(frame.header.length, 8);
        assert_eq!(frame.checksum, 0xE8);
        match frame.message {
            Message::Request(r) => {
                assert_eq!(r.id, 1);
                assert_eq!(r.subtype, 0);
                assert_eq!(&r.payload[..], b"BP123456");
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_notification_roundtrip_and_corruption() {
        let message = Message::Notification(Notification {
            id: 1,
            event: NotifyEvent::PairingOk,
            payload: Bytes::new(),
        });
        let mut encoded = Frame::encode(&message).unwrap();
        assert_eq!(encoded.len(), MIN_FRAME_SIZE);

        let frame = Frame::decode(&encoded).unwrap();
        assert_eq!(frame.message, message);

        // Bump the checksum byte by one
        let last = encoded.len() - 1;
        encoded[last] = encoded[last].wrapping_add(1);
        let result = Frame::decode(&encoded);
        assert!(matches!(
            result,
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_response_roundtrip() {
        let message = Message::Response(Response {
            id: 7,
            error: -5,
            payload: Bytes::from_static(&[0xDE, 0xAD]),
        });
        let encoded = Frame::encode(&message).unwrap();
        let frame = Frame::decode(&encoded).unwrap();
        assert_eq!(frame.message, message);
    }

    #[test]
    fn test_checksum_sensitivity() {
        let encoded = Frame::encode(&request(3, 1, &[0x10, 0x20, 0x30])).unwrap();

        // Flip one payload bit
        let mut corrupted = encoded.to_vec();
        corrupted[4] ^= 0x04;
        let result = Frame::decode(&corrupted);
        match result {
            Err(ProtocolError::ChecksumMismatch { expected, actual }) => {
                assert_ne!(expected, actual);
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_length_boundary() {
        let max_payload = vec![0x11u8; MAX_PAYLOAD_SIZE];
        let message = Message::Request(Request {
            id: 1,
            subtype: 0,
            payload: Bytes::from(max_payload),
        });
        let encoded = Frame::encode(&message).unwrap();
        assert_eq!(encoded.len(), MAX_FRAME_SIZE);
        assert_eq!(Frame::decode(&encoded).unwrap().message, message);

        let oversized = vec![0x11u8; MAX_PAYLOAD_SIZE + 1];
        let message = Message::Request(Request {
            id: 1,
            subtype: 0,
            payload: Bytes::from(oversized),
        });
        assert_eq!(
            Frame::encode(&message),
            Err(ProtocolError::PayloadTooLarge {
                size: MAX_PAYLOAD_SIZE + 1,
                max: MAX_PAYLOAD_SIZE,
            })
        );
    }

    #[test]
    fn test_truncation() {
        let encoded = Frame::encode(&request(1, 0, b"BP123456")).unwrap();
        for len in 0..MIN_FRAME_SIZE {
            let result = Frame::decode(&encoded[..len]);
            assert_eq!(
                result,
                Err(ProtocolError::TruncatedFrame {
                    size: len,
                    min: MIN_FRAME_SIZE,
                })
            );
        }
    }

    #[test]
    fn test_length_mismatch() {
        // Drop one payload byte: the buffer no longer matches the declared length
        let encoded = Frame::encode(&request(1, 0, b"BP123456")).unwrap();
        let short = &encoded[..encoded.len() - 1];
        assert_eq!(
            Frame::decode(short),
            Err(ProtocolError::LengthMismatch {
                declared: 8,
                actual: 7,
            })
        );

        // Header declaring more payload than the buffer carries
        let mut crafted = vec![0u8; MIN_FRAME_SIZE];
        crafted[0] = Header::new(MessageKind::Request, 5).encode().unwrap();
        assert_eq!(
            Frame::decode(&crafted),
            Err(ProtocolError::LengthMismatch {
                declared: 5,
                actual: 0,
            })
        );
    }

    #[test]
    fn test_reserved_bytes_ignored() {
        // Reserved bytes are not validated, only summed into the checksum
        let mut encoded = Frame::encode(&request(1, 0, b"xy")).unwrap().to_vec();
        let reserved_start = encoded.len() - 1 - RESERVED_LEN;
        encoded[reserved_start] = 0x55;
        let body_end = encoded.len() - 1;
        encoded[body_end] = checksum(&encoded[..body_end]);

        let frame = Frame::decode(&encoded).unwrap();
        match frame.message {
            Message::Request(r) => assert_eq!(&r.payload[..], b"xy"),
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_kind_tag() {
        let mut buf = vec![0u8; MIN_FRAME_SIZE];
        buf[0] = 0x03;
        assert_eq!(
            Frame::decode(&buf),
            Err(ProtocolError::UnknownMessageKind(3))
        );
    }

    proptest! {
        #[test]
        fn prop_roundtrip_request(
            id in any::<u8>(),
            subtype in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        ) {
            let message = Message::Request(Request {
                id,
                subtype,
                payload: Bytes::from(payload),
            });
            let encoded = Frame::encode(&message).unwrap();
            let frame = Frame::decode(&encoded).unwrap();
            prop_assert_eq!(frame.message, message);
        }

        #[test]
        fn prop_roundtrip_notification(
            id in any::<u8>(),
            event in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        ) {
            let message = Message::Notification(Notification {
                id,
                event: NotifyEvent::from_byte(event),
                payload: Bytes::from(payload),
            });
            let encoded = Frame::encode(&message).unwrap();
            let frame = Frame::decode(&encoded).unwrap();
            prop_assert_eq!(frame.message, message);
        }

        #[test]
        fn prop_corrupted_checksum_rejected(
            error in any::<i8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
            delta in 1u8..=255,
        ) {
            let message = Message::Response(Response {
                id: 9,
                error,
                payload: Bytes::from(payload),
            });
            let mut encoded = Frame::encode(&message).unwrap();
            let last = encoded.len() - 1;
            encoded[last] = encoded[last].wrapping_add(delta);
            let is_checksum_mismatch = matches!(
                Frame::decode(&encoded),
                Err(ProtocolError::ChecksumMismatch { .. })
            );
            prop_assert!(is_checksum_mismatch);
        }
    }
}
