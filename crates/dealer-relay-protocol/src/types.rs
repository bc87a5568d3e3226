//! Dealer wire types.
//!
//! The dealer pushes JSON envelopes of the shape
//! `{type, headers, uri, payloads}`. Only two kinds matter to the relay:
//! the connection handshake (a `message` whose headers carry the
//! connection id) and cluster updates (a `message` addressed to the
//! cluster topic). Everything else is heartbeat or out-of-scope traffic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

/// The envelope kind used for handshakes and pushes.
pub const MESSAGE_KIND: &str = "message";

/// Header through which the dealer announces the connection id.
pub const CONNECTION_ID_HEADER: &str = "Spotify-Connection-Id";

/// Resource path of cluster state pushes.
pub const CLUSTER_TOPIC: &str = "hm://connect-state/v1/cluster";

// ---------------------------------------------------------------------------
// DealerEnvelope
// ---------------------------------------------------------------------------

/// A raw frame from the dealer socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealerEnvelope {
    /// Envelope kind: `message`, `ping`, `pong`, ...
    #[serde(rename = "type")]
    pub kind: String,

    /// Header map. Values are normally strings; anything else is ignored.
    #[serde(default)]
    pub headers: Map<String, Value>,

    /// Addressed resource path, present on pushes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Push payloads. Cluster updates carry one object with a `cluster` key.
    #[serde(default)]
    pub payloads: Vec<Value>,
}

/// What a dealer envelope means to a relay session.
#[derive(Debug, Clone, PartialEq)]
pub enum DealerMessage {
    /// The dealer's own session handshake, announcing the connection id.
    Handshake {
        /// Id the backend assigned to this socket.
        connection_id: String,
    },

    /// A cluster push carrying the current player state.
    ClusterUpdate {
        /// `payloads[0].cluster.player_state`, untouched.
        player_state: Value,
    },

    /// Heartbeats, duplicate handshakes, and other topics.
    Ignored,
}

impl DealerEnvelope {
    /// Returns `true` if this is a generic `message` envelope.
    pub fn is_message(&self) -> bool {
        self.kind == MESSAGE_KIND
    }

    /// Returns the connection id header, if present and a string.
    pub fn connection_id(&self) -> Option<&str> {
        self.headers.get(CONNECTION_ID_HEADER).and_then(Value::as_str)
    }

    /// Classifies the envelope for a session.
    ///
    /// `handshake_seen` is whether this session already received (and acted
    /// on) a connection id. A repeated handshake is reported as
    /// [`DealerMessage::Ignored`] unless it is also a cluster push.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] when the envelope is
    /// addressed to the cluster topic but has no
    /// `payloads[0].cluster.player_state`.
    pub fn classify(
        self,
        handshake_seen: bool,
    ) -> Result<DealerMessage, ProtocolError> {
        if !self.is_message() {
            return Ok(DealerMessage::Ignored);
        }

        if !handshake_seen {
            if let Some(id) = self.connection_id() {
                return Ok(DealerMessage::Handshake {
                    connection_id: id.to_owned(),
                });
            }
        }

        if self.uri.as_deref() != Some(CLUSTER_TOPIC) {
            return Ok(DealerMessage::Ignored);
        }

        let player_state = self
            .payloads
            .into_iter()
            .next()
            .and_then(|payload| match payload {
                Value::Object(mut payload) => payload.remove("cluster"),
                _ => None,
            })
            .and_then(|cluster| match cluster {
                Value::Object(mut cluster) => cluster.remove("player_state"),
                _ => None,
            })
            .ok_or_else(|| {
                ProtocolError::InvalidMessage(
                    "cluster push without payloads[0].cluster.player_state".into(),
                )
            })?;

        Ok(DealerMessage::ClusterUpdate { player_state })
    }
}

// ---------------------------------------------------------------------------
// Cluster
// ---------------------------------------------------------------------------

/// The connect-state cluster returned by device registration.
///
/// Only `player_state` is read; the remaining fields (devices, timestamps,
/// ...) are kept so the record round-trips intact in logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Current playback state, `Null` when the user has no active player.
    #[serde(default)]
    pub player_state: Value,

    /// Everything else the backend sent.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}
