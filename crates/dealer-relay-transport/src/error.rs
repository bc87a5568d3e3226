/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The remote host could not be reached or the handshake broke off.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The remote answered the upgrade request without switching protocols.
    #[error("server didn't accept WebSocket ({status}): {body}")]
    UpgradeFailure {
        /// HTTP status the remote answered with.
        status: u16,
        /// Response body, lossily decoded as UTF-8.
        body: String,
    },
}
