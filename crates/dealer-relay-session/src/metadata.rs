//! Track metadata lookup used to enrich forwarded player state.

use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{Credential, SessionError};

/// A track description as returned by the lookup. Opaque to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackDescriptor(pub Value);

impl TrackDescriptor {
    /// Unwraps the JSON record.
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Maps an opaque track id to a descriptor.
///
/// Any failure must come back as [`SessionError::EnrichmentFailure`] so the
/// relay can drop just the affected message.
pub trait TrackMetadata: Send + Sync + 'static {
    /// Looks up `track_id` on behalf of `credential`.
    fn track(
        &self,
        track_id: &str,
        credential: &Credential,
    ) -> impl Future<Output = Result<TrackDescriptor, SessionError>> + Send;
}

/// [`TrackMetadata`] over the public `GET /v1/tracks/{id}` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTrackMetadata {
    client: Client,
    api_url: String,
}

impl HttpTrackMetadata {
    /// Creates a lookup against `{api_url}/v1/tracks`.
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }
}

/// `{api_url}/v1/tracks/{track_id}`, with the id escaped as one path
/// segment.
fn track_url(api_url: &str, track_id: &str) -> Result<Url, String> {
    let mut url = Url::parse(api_url).map_err(|e| format!("bad api url {api_url}: {e}"))?;
    url.path_segments_mut()
        .map_err(|()| format!("api url {api_url} cannot take a path"))?
        .pop_if_empty()
        .extend(["v1", "tracks", track_id]);
    Ok(url)
}

impl TrackMetadata for HttpTrackMetadata {
    async fn track(
        &self,
        track_id: &str,
        credential: &Credential,
    ) -> Result<TrackDescriptor, SessionError> {
        let failure = |reason: String| SessionError::EnrichmentFailure {
            track_id: track_id.to_owned(),
            reason,
        };

        let url = track_url(&self.api_url, track_id).map_err(failure)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(failure(format!("({status}): {body}")));
        }

        response
            .json::<Value>()
            .await
            .map(TrackDescriptor)
            .map_err(|e| failure(e.to_string()))
    }
}
