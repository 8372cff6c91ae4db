//! # blewire-client
//!
//! Client library for blewire.
//!
//! This crate provides:
//! - The transport collaborator contract (scan/connect/write/subscribe)
//! - A single-slot mailbox moving received buffers from the transport's
//!   notification context to a waiting consumer
//! - Connected-device request/response exchange with bounded waits
//! - An in-memory loopback transport for development and testing

pub mod client;
pub mod connection;
pub mod error;
pub mod loopback;
pub mod mailbox;
pub mod transport;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
pub use loopback::LoopbackTransport;
pub use mailbox::Mailbox;
pub use transport::{
    format_address, DeviceDescriptor, DeviceHandle, NotifyCallback, Transport, TransportError,
};
