//! Player-state shaping.
//!
//! The browser feed only needs what is playing and how. Queue internals and
//! session housekeeping are stripped, and the `track` reference is later
//! swapped for an enriched descriptor. Field order is preserved throughout
//! (`serde_json` is built with `preserve_order`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

/// Fields removed from every player state before it reaches the client.
pub const DROPPED_FIELDS: [&str; 6] = [
    "next_tracks",
    "prev_tracks",
    "playback_id",
    "context_metadata",
    "session_id",
    "queue_revision",
];

/// Key of the track reference that gets replaced.
pub const TRACK_FIELD: &str = "track";

/// Returns the third `:`-delimited segment of a track URI.
///
/// `spotify:track:4uLU6hMCjMI75M1A2tKUQC` yields `4uLU6hMCjMI75M1A2tKUQC`.
pub fn track_id(uri: &str) -> Option<&str> {
    uri.split(':').nth(2).filter(|id| !id.is_empty())
}

/// A player state with the dropped fields removed, awaiting enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct StrippedState {
    fields: Map<String, Value>,
    track_uri: String,
}

impl StrippedState {
    /// Strips `raw` of [`DROPPED_FIELDS`] and captures its track URI.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidState`] if `raw` is not an object or
    /// has no string `track.uri`.
    pub fn from_raw(raw: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut fields) = raw else {
            return Err(ProtocolError::InvalidState(
                "player state is not an object".into(),
            ));
        };

        for field in DROPPED_FIELDS {
            fields.shift_remove(field);
        }

        let track_uri = fields
            .get(TRACK_FIELD)
            .and_then(|track| track.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProtocolError::InvalidState("player state has no track.uri".into())
            })?
            .to_owned();

        Ok(Self { fields, track_uri })
    }

    /// The original track reference, e.g. `spotify:track:<id>`.
    pub fn track_uri(&self) -> &str {
        &self.track_uri
    }

    /// The opaque track id to hand to the metadata lookup.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidState`] if the URI has fewer than
    /// three segments.
    pub fn track_id(&self) -> Result<&str, ProtocolError> {
        track_id(&self.track_uri).ok_or_else(|| {
            ProtocolError::InvalidState(format!(
                "track uri {:?} has no id segment",
                self.track_uri
            ))
        })
    }

    /// Replaces the track reference with `descriptor`, keeping its position.
    pub fn with_track(mut self, descriptor: Value) -> FilteredState {
        self.fields.insert(TRACK_FIELD.to_owned(), descriptor);
        FilteredState(self.fields)
    }
}

/// The player state as pushed to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilteredState(pub Map<String, Value>);

impl FilteredState {
    /// Returns the field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}
