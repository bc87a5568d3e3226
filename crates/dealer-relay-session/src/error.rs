//! Error types for the session layer.

/// Errors raised while resolving credentials or talking to the backend's
/// HTTP endpoints.
///
/// Variants that stem from an unexpected backend answer carry the status
/// code and response body, which is what you need to spot contract drift.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The identity endpoint refused to issue an access token.
    #[error("failed to get access token ({status}): {body}")]
    AuthFailure {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Connect-state registration did not answer `200 OK`.
    #[error("failed to connect state ({status}): {body}")]
    RegistrationFailure {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Notification subscription did not answer `204 No Content`.
    #[error("failed to subscribe to notifications ({status}): {body}")]
    SubscriptionFailure {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Track-playback registration did not answer `204 No Content`.
    #[error("failed to track playback ({status}): {body}")]
    TrackPlaybackFailure {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The metadata lookup could not describe a track.
    #[error("failed to enrich track {track_id}: {reason}")]
    EnrichmentFailure {
        /// The opaque id that was looked up.
        track_id: String,
        /// What went wrong.
        reason: String,
    },

    /// The credential cache could not be read or written.
    #[error("credential cache error: {0}")]
    Cache(String),

    /// The HTTP request itself failed (DNS, TLS, decode, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        Self::Cache(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_display() {
        let err = SessionError::AuthFailure {
            status: 401,
            body: "invalid cookie".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to get access token (401): invalid cookie"
        );
    }

    #[test]
    fn test_registration_failure_display() {
        let err = SessionError::RegistrationFailure {
            status: 404,
            body: "Device not found".into(),
        };
        assert!(err.to_string().contains("(404): Device not found"));
    }

    #[test]
    fn test_enrichment_failure_names_track() {
        let err = SessionError::EnrichmentFailure {
            track_id: "abc".into(),
            reason: "(429): slow down".into(),
        };
        assert_eq!(err.to_string(), "failed to enrich track abc: (429): slow down");
    }
}
