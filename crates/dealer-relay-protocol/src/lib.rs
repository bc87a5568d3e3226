//! Wire protocol for dealer-relay.
//!
//! This crate knows the two "languages" a relay session translates between:
//!
//! - **Dealer envelopes** ([`DealerEnvelope`], [`DealerMessage`]): what the
//!   backend pushes, and how to tell a handshake from a cluster update.
//! - **Player state** ([`StrippedState`], [`FilteredState`]): the reduced
//!   record the browser receives.
//! - **Codec** ([`Codec`], [`JsonCodec`]): text frames to values and back.
//!
//! It does no I/O. Enrichment of the track field happens a layer up, where
//! the metadata collaborator and credentials are available.
//!
//! ```text
//! Transport (text frames) → Protocol (envelopes, state) → Relay (bridge)
//! ```

mod codec;
mod error;
mod state;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use state::{DROPPED_FIELDS, FilteredState, StrippedState, TRACK_FIELD, track_id};
pub use types::{
    CLUSTER_TOPIC, CONNECTION_ID_HEADER, Cluster, DealerEnvelope, DealerMessage,
    MESSAGE_KIND,
};
