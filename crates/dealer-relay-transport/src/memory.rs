//! In-process connection pairs.
//!
//! Each end of a [`MemoryConnection::pair`] receives what the other end
//! sends. Closing an end drops its outbound channel, so the peer's next
//! `recv` returns `Ok(None)`, mirroring a clean WebSocket close. Every
//! `close` call is counted, which lets tests assert exactly how often a
//! session tried to shut a socket down.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, TransportError};

enum Frame {
    Text(String),
    Error(String),
}

/// Shared view of how many times `close` was called on one end.
#[derive(Debug, Clone, Default)]
pub struct CloseCounter(Arc<AtomicUsize>);

impl CloseCounter {
    /// Returns the number of `close` calls so far.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// One end of an in-memory connection pair.
pub struct MemoryConnection {
    id: ConnectionId,
    outbound: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Frame>>,
    closes: CloseCounter,
}

impl MemoryConnection {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (Self::end(a_tx, b_rx), Self::end(b_tx, a_rx))
    }

    fn end(
        outbound: mpsc::UnboundedSender<Frame>,
        inbound: mpsc::UnboundedReceiver<Frame>,
    ) -> Self {
        Self {
            id: ConnectionId::next(),
            outbound: Mutex::new(Some(outbound)),
            inbound: Mutex::new(inbound),
            closes: CloseCounter::default(),
        }
    }

    /// Returns a handle that keeps counting after this end is moved away.
    pub fn close_counter(&self) -> CloseCounter {
        self.closes.clone()
    }

    /// Makes the peer's next `recv` fail, simulating a socket error.
    pub async fn fail(&self, reason: &str) -> Result<(), TransportError> {
        self.push(Frame::Error(reason.to_owned())).await
    }

    async fn push(&self, frame: Frame) -> Result<(), TransportError> {
        let outbound = self.outbound.lock().await;
        let Some(tx) = outbound.as_ref() else {
            return Err(TransportError::ConnectionClosed(format!(
                "{} already closed",
                self.id
            )));
        };
        tx.send(frame)
            .map_err(|_| TransportError::SendFailed("peer dropped".into()))
    }
}

impl Connection for MemoryConnection {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.push(Frame::Text(text.to_owned())).await
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        match self.inbound.lock().await.recv().await {
            Some(Frame::Text(text)) => Ok(Some(text)),
            Some(Frame::Error(reason)) => Err(TransportError::ReceiveFailed(reason)),
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closes.bump();
        self.outbound.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
