//! Player-state filter: strip, then enrich the track field.

use dealer_relay_protocol::{FilteredState, StrippedState};
use dealer_relay_session::{Credential, TrackMetadata};
use serde_json::Value;

use crate::RelayError;

/// Turns a raw player state into what the client receives.
pub struct StateFilter<M> {
    metadata: M,
}

impl<M: TrackMetadata> StateFilter<M> {
    /// Creates a filter that enriches tracks through `metadata`.
    pub fn new(metadata: M) -> Self {
        Self { metadata }
    }

    /// Drops the housekeeping fields and replaces `track` with the
    /// descriptor looked up for its id.
    ///
    /// # Errors
    /// [`RelayError::Protocol`] if the state is malformed,
    /// [`RelayError::Session`] carrying an enrichment failure if the lookup
    /// fails.
    pub async fn filter(
        &self,
        raw: Value,
        credential: &Credential,
    ) -> Result<FilteredState, RelayError> {
        let stripped = StrippedState::from_raw(raw)?;
        let descriptor = self.metadata.track(stripped.track_id()?, credential).await?;
        Ok(stripped.with_track(descriptor.into_value()))
    }
}
