//! High-level client API.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use blewire_protocol::{Notification, Request, Response};

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use crate::transport::{DeviceDescriptor, Transport};

/// High-level client for one peripheral.
pub struct Client {
    transport: Arc<dyn Transport>,
    conn: Arc<Connection>,
}

impl Client {
    /// Creates a new client over the given transport.
    pub fn new(transport: Arc<dyn Transport>, config: ConnectionConfig) -> Self {
        let conn = Arc::new(Connection::new(transport.clone(), config));
        Self { transport, conn }
    }

    /// Scans for nearby devices.
    pub async fn scan(&self, duration: Duration) -> Result<Vec<DeviceDescriptor>, ClientError> {
        Ok(self.transport.scan(duration).await?)
    }

    /// Connects to the device at `address`.
    pub async fn connect(&self, address: &str) -> Result<(), ClientError> {
        self.conn.connect(address).await
    }

    /// Disconnects from the device.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.conn.disconnect().await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    /// Sends a command with an auto-assigned id and returns the response
    /// payload. Negative device status codes surface as `DeviceError`.
    pub async fn send(&self, subtype: u8, payload: &[u8]) -> Result<Bytes, ClientError> {
        let id = self.conn.next_command_id();
        let response = self.command(id, subtype, payload).await?;
        Ok(response.payload)
    }

    /// Sends a command with a caller-assigned id and returns the full
    /// response. Negative device status codes surface as `DeviceError`.
    pub async fn command(
        &self,
        id: u8,
        subtype: u8,
        payload: &[u8],
    ) -> Result<Response, ClientError> {
        let request = Request {
            id,
            subtype,
            payload: Bytes::copy_from_slice(payload),
        };
        let response = self.conn.request(request).await?;
        if response.is_error() {
            return Err(ClientError::DeviceError {
                id: response.id,
                code: response.error,
            });
        }
        Ok(response)
    }

    /// Waits for the next unsolicited notification.
    pub async fn next_notification(&self, timeout: Duration) -> Result<Notification, ClientError> {
        self.conn.next_notification(timeout).await
    }
}
