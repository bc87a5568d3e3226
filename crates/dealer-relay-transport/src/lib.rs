//! Connection abstraction for dealer-relay.
//!
//! A relay session owns two text-framed connections: the browser-facing
//! client socket and the backend dealer socket. Both are driven through the
//! [`Connection`] trait so the bridge never cares which side is which
//! implementation.
//!
//! # Feature Flags
//!
//! - `websocket` (default): outbound dealer sockets via `tokio-tungstenite`
//! - `axum` (default): inbound client sockets accepted by an axum upgrade
//! - `memory`: in-process connection pairs, used by tests

#![allow(async_fn_in_trait)]

#[cfg(feature = "axum")]
mod client;
mod error;
#[cfg(any(test, feature = "memory"))]
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

#[cfg(feature = "axum")]
pub use client::ClientConnection;
pub use error::TransportError;
#[cfg(any(test, feature = "memory"))]
pub use memory::{CloseCounter, MemoryConnection};
#[cfg(feature = "websocket")]
pub use websocket::DealerConnection;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single connection that exchanges text frames.
///
/// Send and receive go through separate halves, so a pending `recv` never
/// holds up a `send` on the same connection.
pub trait Connection: Send + Sync + 'static {
    /// Sends a text frame to the remote peer.
    async fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Receives the next text frame from the remote peer.
    ///
    /// Binary frames are decoded lossily as UTF-8. Ping/pong frames are
    /// skipped. Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<String>, TransportError>;

    /// Starts closing the connection.
    async fn close(&self) -> Result<(), TransportError>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::next();
        assert_eq!(id.to_string(), format!("conn-{}", id.into_inner()));
    }

    #[test]
    fn test_connection_id_next_is_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }
}
