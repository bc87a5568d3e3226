//! Error types for the protocol layer.

/// Errors that can occur while decoding dealer traffic or shaping player
/// state for the client.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON or a shape mismatch.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A dealer envelope addressed a known topic but its payload did not
    /// have the expected structure.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A player state was not an object or lacked a usable track reference.
    #[error("invalid player state: {0}")]
    InvalidState(String),
}
