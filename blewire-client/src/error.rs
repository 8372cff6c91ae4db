//! Client error types.

use blewire_protocol::ProtocolError;
use thiserror::Error;

use crate::transport::TransportError;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("not connected")]
    NotConnected,

    #[error("receive timeout")]
    ReceiveTimeout,

    #[error("device returned error {code} for command {id}")]
    DeviceError { id: u8, code: i8 },
}

impl ClientError {
    /// Returns whether the caller may reasonably re-issue the request.
    ///
    /// The core never retries on its own; a corrupted frame or an expired
    /// wait leaves the device in a state where one more attempt is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::ReceiveTimeout
                | ClientError::Protocol(ProtocolError::ChecksumMismatch { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ClientError::ReceiveTimeout.is_retryable());
        assert!(ClientError::Protocol(ProtocolError::ChecksumMismatch {
            expected: 1,
            actual: 2,
        })
        .is_retryable());

        assert!(!ClientError::NotConnected.is_retryable());
        assert!(!ClientError::DeviceError { id: 1, code: -1 }.is_retryable());
        assert!(!ClientError::Protocol(ProtocolError::UnknownMessageKind(3)).is_retryable());
    }
}
