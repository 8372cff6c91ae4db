//! Transport collaborator contract.
//!
//! The protocol core does not talk to hardware. Discovery, connection and
//! raw byte transfer are provided by an implementation of [`Transport`]; the
//! loopback backend in this crate is one, a platform BLE stack would be
//! another. Frame boundaries are the transport's packet boundaries: every
//! buffer handed to the subscription callback is one complete frame.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Value-changed callback registered via [`Transport::subscribe`].
///
/// Invoked with one complete inbound buffer per notification, from an
/// unspecified execution context. This is the producer side of the receive
/// mailbox.
pub type NotifyCallback = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Transport failures, passed through to the caller unmodified.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("no connected device")]
    NotConnected,

    #[error("characteristic {service}/{characteristic} unavailable")]
    CharacteristicUnavailable {
        service: usize,
        characteristic: usize,
    },

    #[error("backend error: {0}")]
    Backend(String),
}

/// A device discovered during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Advertised device name, or "Unknown".
    pub name: String,
    /// Formatted hardware address, e.g. `AA:BB:CC:DD:EE:FF`.
    pub address: String,
    /// Stable identifier used for scan deduplication.
    pub id: String,
    /// Received signal strength in dBm.
    pub signal_strength: i16,
}

/// Opaque handle to a connected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    id: String,
}

impl DeviceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Device discovery, connection and raw byte transfer primitives.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Scans for nearby devices for `duration`.
    ///
    /// The returned set is deduplicated by identifier.
    async fn scan(&self, duration: Duration) -> Result<Vec<DeviceDescriptor>, TransportError>;

    /// Connects to a device by its formatted address.
    async fn connect(&self, address: &str) -> Result<DeviceHandle, TransportError>;

    /// Disconnects a previously connected device.
    async fn disconnect(&self, handle: &DeviceHandle) -> Result<(), TransportError>;

    /// Writes raw bytes to the given service/characteristic.
    async fn write(
        &self,
        handle: &DeviceHandle,
        service: usize,
        characteristic: usize,
        bytes: &[u8],
    ) -> Result<(), TransportError>;

    /// Registers for value-change notifications on the given
    /// service/characteristic.
    ///
    /// The callback runs on an unspecified execution context whenever new
    /// bytes arrive.
    async fn subscribe(
        &self,
        handle: &DeviceHandle,
        service: usize,
        characteristic: usize,
        on_value_changed: NotifyCallback,
    ) -> Result<(), TransportError>;
}

/// Formats a raw 48-bit hardware address as `AA:BB:CC:DD:EE:FF`.
pub fn format_address(address: u64) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        (address >> 40) & 0xFF,
        (address >> 32) & 0xFF,
        (address >> 24) & 0xFF,
        (address >> 16) & 0xFF,
        (address >> 8) & 0xFF,
        address & 0xFF,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_address() {
        assert_eq!(format_address(0x0000AABBCCDDEEFF), "AA:BB:CC:DD:EE:FF");
        assert_eq!(format_address(0), "00:00:00:00:00:00");
        assert_eq!(format_address(0x0000010203040506), "01:02:03:04:05:06");
    }

    #[test]
    fn test_device_handle_id() {
        let handle = DeviceHandle::new("12345");
        assert_eq!(handle.id(), "12345");
    }
}
