//! In-memory transport backend for development and testing.
//!
//! Simulates a peripheral at the other end of the link: discovered devices
//! come from a configurable advertisement list, and every valid request
//! frame written to the device is answered through the subscription
//! callback with a response echoing the request id and payload. Corrupt
//! frames are dropped with a warning, the way firmware would drop them.
//!
//! The callback is invoked on the writer's task here; a real backend
//! invokes it from its own event context. Consumers must not assume either.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use blewire_protocol::{Frame, Message, Notification, Response};

use crate::transport::{
    format_address, DeviceDescriptor, DeviceHandle, NotifyCallback, Transport, TransportError,
};

/// Raw address of the default simulated device.
pub const DEFAULT_DEVICE_ADDRESS: u64 = 0x0000E4F574775A01;

/// Name of the default simulated device.
pub const DEFAULT_DEVICE_NAME: &str = "EAF_574775";

/// In-memory [`Transport`] implementation.
pub struct LoopbackTransport {
    /// Raw advertisement stream; may contain duplicates, scan deduplicates.
    advertisements: Mutex<Vec<DeviceDescriptor>>,
    subscriber: Mutex<Option<NotifyCallback>>,
    /// Identifier of the currently connected device.
    connected: Mutex<Option<String>>,
    /// Scripted device error codes per request subtype.
    error_replies: Mutex<HashMap<u8, i8>>,
    /// When muted, writes are accepted but never answered.
    muted: AtomicBool,
}

impl LoopbackTransport {
    /// Creates a loopback advertising the default simulated device.
    pub fn new() -> Self {
        Self::with_devices(vec![DeviceDescriptor {
            name: DEFAULT_DEVICE_NAME.to_string(),
            address: format_address(DEFAULT_DEVICE_ADDRESS),
            id: DEFAULT_DEVICE_ADDRESS.to_string(),
            signal_strength: -60,
        }])
    }

    /// Creates a loopback advertising the given devices.
    pub fn with_devices(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            advertisements: Mutex::new(devices),
            subscriber: Mutex::new(None),
            connected: Mutex::new(None),
            error_replies: Mutex::new(HashMap::new()),
            muted: AtomicBool::new(false),
        }
    }

    /// Appends a raw advertisement. Duplicates are allowed; `scan`
    /// deduplicates by identifier.
    pub fn advertise(&self, descriptor: DeviceDescriptor) {
        self.advertisements.lock().push(descriptor);
    }

    /// Scripts a device error code for every request with this subtype.
    pub fn fail_subtype(&self, subtype: u8, code: i8) {
        self.error_replies.lock().insert(subtype, code);
    }

    /// Suppresses (or restores) responses to written requests.
    pub fn mute(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    /// Pushes an unsolicited notification frame to the subscriber.
    pub fn push_notification(&self, notification: Notification) -> Result<(), TransportError> {
        let encoded = Frame::encode(&Message::Notification(notification))
            .map_err(|e| TransportError::Backend(e.to_string()))?;
        self.push_raw(encoded.freeze())
    }

    /// Pushes arbitrary bytes to the subscriber, bypassing the frame
    /// encoder. Useful for corruption tests.
    pub fn push_raw(&self, bytes: Bytes) -> Result<(), TransportError> {
        let callback = self.subscriber.lock().clone();
        match callback {
            Some(callback) => {
                callback(bytes);
                Ok(())
            }
            None => Err(TransportError::NotConnected),
        }
    }

    fn check_connected(&self, handle: &DeviceHandle) -> Result<(), TransportError> {
        match self.connected.lock().as_deref() {
            Some(id) if id == handle.id() => Ok(()),
            _ => Err(TransportError::NotConnected),
        }
    }

    /// Builds the simulated firmware's reply to a decoded request.
    fn reply_to(&self, id: u8, subtype: u8, payload: Bytes) -> Response {
        let error = self
            .error_replies
            .lock()
            .get(&subtype)
            .copied()
            .unwrap_or(0);
        let payload = if error == 0 { payload } else { Bytes::new() };
        Response { id, error, payload }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn scan(&self, duration: Duration) -> Result<Vec<DeviceDescriptor>, TransportError> {
        // No radio to listen to, so the scan window is not actually waited out.
        debug!("Scanning for {:?}", duration);

        let mut seen = HashSet::new();
        let mut devices = Vec::new();
        for descriptor in self.advertisements.lock().iter() {
            if seen.insert(descriptor.id.clone()) {
                devices.push(descriptor.clone());
            }
        }

        debug!("Scan finished, {} device(s)", devices.len());
        Ok(devices)
    }

    async fn connect(&self, address: &str) -> Result<DeviceHandle, TransportError> {
        let descriptor = self
            .advertisements
            .lock()
            .iter()
            .find(|d| d.address == address)
            .cloned()
            .ok_or_else(|| TransportError::DeviceNotFound(address.to_string()))?;

        debug!("Connected to {} ({})", descriptor.name, descriptor.address);
        *self.connected.lock() = Some(descriptor.id.clone());
        Ok(DeviceHandle::new(descriptor.id))
    }

    async fn disconnect(&self, handle: &DeviceHandle) -> Result<(), TransportError> {
        self.check_connected(handle)?;
        *self.connected.lock() = None;
        *self.subscriber.lock() = None;
        debug!("Disconnected {}", handle.id());
        Ok(())
    }

    async fn write(
        &self,
        handle: &DeviceHandle,
        service: usize,
        characteristic: usize,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        self.check_connected(handle)?;
        debug!(
            "Write {} byte(s) to {}/{}",
            bytes.len(),
            service,
            characteristic
        );

        if self.muted.load(Ordering::SeqCst) {
            return Ok(());
        }

        let frame = match Frame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                // Firmware drops malformed frames without answering
                warn!("Dropping malformed frame: {}", e);
                return Ok(());
            }
        };

        match frame.message {
            Message::Request(request) => {
                let response = self.reply_to(request.id, request.subtype, request.payload);
                let encoded = Frame::encode(&Message::Response(response))
                    .map_err(|e| TransportError::Backend(e.to_string()))?;
                self.push_raw(encoded.freeze())?;
            }
            other => {
                warn!("Ignoring non-request frame written to device: {:?}", other.kind());
            }
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        handle: &DeviceHandle,
        service: usize,
        characteristic: usize,
        on_value_changed: NotifyCallback,
    ) -> Result<(), TransportError> {
        self.check_connected(handle)?;
        debug!("Subscribed to {}/{}", service, characteristic);
        *self.subscriber.lock() = Some(on_value_changed);
        Ok(())
    }
}
