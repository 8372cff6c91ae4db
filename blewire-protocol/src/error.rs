//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding frames.
///
/// None of these are fatal: the worst outcome is a rejected frame, and the
/// caller decides whether to discard it or re-issue the request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("length {0} does not fit the 6-bit header field (max {max})", max = crate::MAX_PAYLOAD_SIZE)]
    InvalidLength(u8),

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("unknown message kind tag: {0}")]
    UnknownMessageKind(u8),

    #[error("truncated frame: {size} bytes (min {min})")]
    TruncatedFrame { size: usize, min: usize },

    #[error("length mismatch: header declares {declared} payload bytes, buffer carries {actual}")]
    LengthMismatch { declared: u8, actual: usize },

    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::InvalidLength(100);
        assert!(err.to_string().contains("100"));

        let err = ProtocolError::PayloadTooLarge { size: 64, max: 63 };
        assert!(err.to_string().contains("64"));

        let err = ProtocolError::UnknownMessageKind(3);
        assert!(err.to_string().contains("3"));

        let err = ProtocolError::TruncatedFrame { size: 5, min: 8 };
        assert!(err.to_string().contains("5"));

        let err = ProtocolError::LengthMismatch {
            declared: 8,
            actual: 7,
        };
        assert!(err.to_string().contains("8"));

        // Checksums use hex format
        let err = ProtocolError::ChecksumMismatch {
            expected: 0xAB,
            actual: 0xCD,
        };
        let msg = err.to_string();
        assert!(msg.contains("0xab") || msg.contains("0xAB"));
    }
}
