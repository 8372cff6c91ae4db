//! Single-slot receive hand-off.
//!
//! Moves one completed inbound buffer from the transport's notification
//! callback context to a waiting consumer. The slot holds at most one
//! buffer; a delivery before the previous one is consumed overwrites it
//! (last-write-wins), matching the one-outstanding-request discipline of
//! the protocol. The most recent delivery is guaranteed visible to the next
//! successful wait; nothing is guaranteed about overwritten buffers.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::ClientError;

/// Cloneable handle to a single-slot mailbox.
///
/// `deliver` is synchronous and callable from any thread or task, so it can
/// be handed to a transport as the subscription callback. Consumers wait
/// asynchronously with [`Mailbox::recv`] or [`Mailbox::recv_timeout`].
#[derive(Clone)]
pub struct Mailbox {
    inner: Arc<MailboxInner>,
}

struct MailboxInner {
    slot: Mutex<Option<Bytes>>,
    notify: Notify,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MailboxInner {
                slot: Mutex::new(None),
                notify: Notify::new(),
            }),
        }
    }

    /// Producer side: stores `buf` in the slot, overwriting any unconsumed
    /// delivery, and wakes the consumer.
    pub fn deliver(&self, buf: Bytes) {
        *self.inner.slot.lock() = Some(buf);
        self.inner.notify.notify_one();
    }

    /// Consumer side: waits until a buffer is present, then takes it and
    /// clears the slot.
    pub async fn recv(&self) -> Bytes {
        loop {
            if let Some(buf) = self.inner.slot.lock().take() {
                return buf;
            }
            // A delivery that lands between the check above and this await
            // has already stored a wake-up permit, so it is not lost.
            self.inner.notify.notified().await;
        }
    }

    /// Consumer side with a bounded wait.
    ///
    /// Returns `ReceiveTimeout` if nothing is delivered within `timeout`.
    pub async fn recv_timeout(&self, timeout: Duration) -> Result<Bytes, ClientError> {
        tokio::time::timeout(timeout, self.recv())
            .await
            .map_err(|_| ClientError::ReceiveTimeout)
    }

    /// Discards any unconsumed delivery.
    pub fn clear(&self) {
        *self.inner.slot.lock() = None;
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_write_wins() {
        let mailbox = Mailbox::new();
        mailbox.deliver(Bytes::from_static(b"first"));
        mailbox.deliver(Bytes::from_static(b"second"));

        let buf = mailbox.recv_timeout(Duration::from_millis(50)).await.unwrap();
        assert_eq!(&buf[..], b"second");

        // Slot is now empty again
        let result = mailbox.recv_timeout(Duration::from_millis(10)).await;
        assert!(matches!(result, Err(ClientError::ReceiveTimeout)));
    }

    #[tokio::test]
    async fn test_timeout_on_empty_slot() {
        let mailbox = Mailbox::new();
        let result = mailbox.recv_timeout(Duration::from_millis(10)).await;
        assert!(matches!(result, Err(ClientError::ReceiveTimeout)));
    }

    #[tokio::test]
    async fn test_delivery_wakes_waiting_consumer() {
        let mailbox = Mailbox::new();

        let producer = mailbox.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.deliver(Bytes::from_static(b"late"));
        });

        let buf = mailbox
            .recv_timeout(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(&buf[..], b"late");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_delivery_from_plain_thread() {
        let mailbox = Mailbox::new();

        let producer = mailbox.clone();
        std::thread::spawn(move || {
            producer.deliver(Bytes::from_static(b"cross-thread"));
        });

        let buf = mailbox
            .recv_timeout(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(&buf[..], b"cross-thread");
    }

    #[test]
    fn test_clear() {
        tokio_test::block_on(async {
            let mailbox = Mailbox::new();
            mailbox.deliver(Bytes::from_static(b"stale"));
            mailbox.clear();
            let result = mailbox.recv_timeout(Duration::from_millis(10)).await;
            assert!(matches!(result, Err(ClientError::ReceiveTimeout)));
        });
    }
}
