//! Connected-device request/response exchange.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use blewire_protocol::{Frame, Message, Notification, Request, Response, MSG_ID_MAX};

use crate::error::ClientError;
use crate::mailbox::Mailbox;
use crate::transport::{DeviceHandle, NotifyCallback, Transport};

/// Default bound on a response or notification wait.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default GATT service index of the command characteristic.
pub const DEFAULT_SERVICE: usize = 3;

/// Default GATT characteristic index within the command service.
pub const DEFAULT_CHARACTERISTIC: usize = 0;

/// Capacity of the notification fan-out channel.
const NOTIFY_CHANNEL_CAPACITY: usize = 32;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Upper bound on every response or notification wait.
    pub request_timeout: Duration,
    /// GATT service index used for writes and subscriptions.
    pub service: usize,
    /// GATT characteristic index used for writes and subscriptions.
    pub characteristic: usize,
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            service: DEFAULT_SERVICE,
            characteristic: DEFAULT_CHARACTERISTIC,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_endpoint(mut self, service: usize, characteristic: usize) -> Self {
        self.service = service;
        self.characteristic = characteristic;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection to one peripheral.
///
/// The protocol allows a single outstanding request; `request` and
/// `next_notification` serialize behind an internal lock, so a `Connection`
/// can be shared freely.
pub struct Connection {
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    handle: Mutex<Option<DeviceHandle>>,
    /// Receive hand-off fed by the transport's subscription callback.
    mailbox: Mailbox,
    /// Next command id, wrapping at `MSG_ID_MAX`.
    next_id: AtomicU8,
    /// One request (or notification wait) in flight at a time.
    exchange_lock: tokio::sync::Mutex<()>,
    /// Fan-out for notifications that arrive while waiting on a response.
    notifications: broadcast::Sender<Notification>,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(transport: Arc<dyn Transport>, config: ConnectionConfig) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFY_CHANNEL_CAPACITY);
        Self {
            config,
            transport,
            handle: Mutex::new(None),
            mailbox: Mailbox::new(),
            next_id: AtomicU8::new(0),
            exchange_lock: tokio::sync::Mutex::new(()),
            notifications,
        }
    }

    /// Connects to the device at `address` and subscribes for inbound
    /// frames. The subscription callback is the producer side of the
    /// receive mailbox.
    pub async fn connect(&self, address: &str) -> Result<(), ClientError> {
        tracing::debug!("Connecting to {}...", address);
        let handle = self.transport.connect(address).await?;

        let producer = self.mailbox.clone();
        let callback: NotifyCallback = Arc::new(move |bytes| producer.deliver(bytes));
        self.transport
            .subscribe(
                &handle,
                self.config.service,
                self.config.characteristic,
                callback,
            )
            .await?;

        self.mailbox.clear();
        *self.handle.lock() = Some(handle);
        tracing::debug!("Connected and subscribed");
        Ok(())
    }

    /// Disconnects from the device, if connected.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            tracing::debug!("Disconnecting {}", handle.id());
            self.transport.disconnect(&handle).await?;
        }
        Ok(())
    }

    /// Returns whether a device is connected.
    pub fn is_connected(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Allocates the next command id, wrapping back to 0 after
    /// `MSG_ID_MAX`.
    pub fn next_command_id(&self) -> u8 {
        self.next_id.fetch_add(1, Ordering::SeqCst) & MSG_ID_MAX
    }

    /// Subscribes to notifications observed while waiting on responses.
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Sends a request and waits for the matching response.
    ///
    /// Notifications that arrive while waiting are fanned out to
    /// [`Connection::notifications`] subscribers. The echoed response id is
    /// checked against the request id and logged on mismatch; correlation
    /// stays implicit per the single-outstanding-request discipline.
    pub async fn request(&self, request: Request) -> Result<Response, ClientError> {
        let _guard = self.exchange_lock.lock().await;

        let handle = self.handle.lock().clone().ok_or(ClientError::NotConnected)?;
        let encoded = Frame::encode(&Message::Request(request.clone()))?;
        tracing::debug!(
            "Sending request id={} subtype={} ({} bytes)",
            request.id,
            request.subtype,
            encoded.len()
        );
        self.transport
            .write(
                &handle,
                self.config.service,
                self.config.characteristic,
                &encoded,
            )
            .await?;

        let response = tokio::time::timeout(self.config.request_timeout, async {
            loop {
                let buf = self.mailbox.recv().await;
                let frame = Frame::decode(&buf)?;
                match frame.message {
                    Message::Response(response) => return Ok::<_, ClientError>(response),
                    Message::Notification(notification) => {
                        tracing::debug!(
                            "Notification during response wait: {:?}",
                            notification.event
                        );
                        let _ = self.notifications.send(notification);
                    }
                    Message::Request(_) => {
                        tracing::warn!("Ignoring request frame pushed by the device");
                    }
                }
            }
        })
        .await
        .map_err(|_| ClientError::ReceiveTimeout)??;

        if response.id != request.id {
            tracing::warn!(
                "Response id {} does not match request id {}",
                response.id,
                request.id
            );
        }

        Ok(response)
    }

    /// Waits for the next unsolicited notification.
    pub async fn next_notification(&self, timeout: Duration) -> Result<Notification, ClientError> {
        let _guard = self.exchange_lock.lock().await;

        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        tokio::time::timeout(timeout, async {
            loop {
                let buf = self.mailbox.recv().await;
                let frame = Frame::decode(&buf)?;
                match frame.message {
                    Message::Notification(notification) => {
                        let _ = self.notifications.send(notification.clone());
                        return Ok::<_, ClientError>(notification);
                    }
                    other => {
                        tracing::warn!(
                            "Ignoring {:?} frame while waiting for a notification",
                            other.kind()
                        );
                    }
                }
            }
        })
        .await
        .map_err(|_| ClientError::ReceiveTimeout)?
    }

    /// Raw payload write, bypassing the request/response exchange.
    pub async fn write_raw(&self, bytes: Bytes) -> Result<(), ClientError> {
        let handle = self.handle.lock().clone().ok_or(ClientError::NotConnected)?;
        self.transport
            .write(
                &handle,
                self.config.service,
                self.config.characteristic,
                &bytes,
            )
            .await?;
        Ok(())
    }
}
