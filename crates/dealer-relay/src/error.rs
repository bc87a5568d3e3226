//! Unified error type for dealer-relay.

use dealer_relay_protocol::ProtocolError;
use dealer_relay_session::SessionError;
use dealer_relay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each layer variant lets `?` lift sub-crate
/// errors without ceremony.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A socket-level error (connect, upgrade, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A dealer frame or player state could not be understood.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A backend HTTP call or the credential cache failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Required configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Binding or serving the listener failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
