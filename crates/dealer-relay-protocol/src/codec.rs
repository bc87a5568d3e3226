//! Codec trait and the JSON implementation.
//!
//! Both sockets of a relay session carry text frames, so a codec here maps
//! between Rust values and `String`s rather than raw bytes.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values into text frames and decodes them back.
///
/// `Send + Sync + 'static` because one codec is shared by every relay
/// session task for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame is malformed or does
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`. The dealer speaks JSON and so does
/// the browser feed.
///
/// ```rust
/// use dealer_relay_protocol::{Codec, DealerEnvelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let envelope: DealerEnvelope = codec.decode(r#"{"type":"ping"}"#).unwrap();
/// assert_eq!(envelope.kind, "ping");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
