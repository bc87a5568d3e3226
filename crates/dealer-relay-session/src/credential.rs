//! Access credentials and how they are resolved.
//!
//! The relay never checks a token's expiry itself. The cache is
//! authoritative: whatever it returns is used verbatim, and a token is
//! written back with a TTL that makes the store evict it when the token
//! dies. A miss costs one identity round-trip. Concurrent misses each
//! refresh independently and the last write wins, which is harmless
//! because every issued token is valid.

use std::fmt;
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use serde::Deserialize;

use crate::SessionError;
use crate::endpoints::with_browser_headers;

/// Cache key under which the shared access token lives.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A bearer token for the backend.
///
/// `expires_at_ms` is only known for tokens fetched by this process; a
/// token read back from the cache carries `None`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at_ms: Option<i64>,
}

impl Credential {
    /// Wraps a token of unknown expiry.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at_ms: None,
        }
    }

    /// Wraps a freshly issued token with its absolute expiry.
    pub fn with_expiry(token: impl Into<String>, expires_at_ms: i64) -> Self {
        Self {
            token: token.into(),
            expires_at_ms: Some(expires_at_ms),
        }
    }

    /// The raw token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Expiry in milliseconds since the Unix epoch, if known.
    pub fn expires_at_ms(&self) -> Option<i64> {
        self.expires_at_ms
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CredentialCache
// ---------------------------------------------------------------------------

/// A key-value store with per-entry TTL eviction.
///
/// Implementations must tolerate concurrent `get`/`put` from many relay
/// sessions. TTL enforcement belongs to the store.
pub trait CredentialCache: Send + Sync + 'static {
    /// Reads a value, `None` if absent or evicted.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, SessionError>> + Send;

    /// Writes a value that the store evicts after `ttl_secs` seconds.
    fn put(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

// ---------------------------------------------------------------------------
// CredentialProvider
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenResponse {
    access_token: String,
    access_token_expiration_timestamp_ms: i64,
}

/// Fetches access tokens from the identity endpoint, through a cache.
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    client: Client,
    identity_url: String,
}

impl CredentialProvider {
    /// Creates a provider that calls `{identity_url}/get_access_token`.
    pub fn new(client: Client, identity_url: impl Into<String>) -> Self {
        Self {
            client,
            identity_url: identity_url.into(),
        }
    }

    /// Returns the cached credential, or fetches and caches a fresh one.
    ///
    /// `cookies` is the raw `Cookie` header of a logged-in web session.
    ///
    /// # Errors
    /// - [`SessionError::AuthFailure`]: the identity endpoint answered
    ///   anything but `200 OK`
    /// - [`SessionError::Cache`]: the cache could not be read or written
    /// - [`SessionError::Http`]: the request failed or the body was not
    ///   the expected JSON
    pub async fn resolve<K: CredentialCache>(
        &self,
        cache: &K,
        cookies: &str,
    ) -> Result<Credential, SessionError> {
        if let Some(token) = cache.get(ACCESS_TOKEN_KEY).await? {
            tracing::debug!("using cached access token");
            return Ok(Credential::new(token));
        }

        let issued = self.fetch(cookies).await?;
        let ttl = cache_ttl_secs(
            issued.access_token_expiration_timestamp_ms,
            unix_now_secs(),
        );
        cache.put(ACCESS_TOKEN_KEY, &issued.access_token, ttl).await?;
        tracing::info!(ttl_secs = ttl, "fetched fresh access token");

        Ok(Credential::with_expiry(
            issued.access_token,
            issued.access_token_expiration_timestamp_ms,
        ))
    }

    async fn fetch(&self, cookies: &str) -> Result<AccessTokenResponse, SessionError> {
        let request = self
            .client
            .get(format!("{}/get_access_token", self.identity_url))
            .query(&[("reason", "transport"), ("productType", "web_player")])
            .header(reqwest::header::COOKIE, cookies);

        let response = with_browser_headers(request).send().await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, %body, "identity endpoint refused token");
            return Err(SessionError::AuthFailure { status, body });
        }

        Ok(response.json().await?)
    }
}

/// Seconds until `expires_at_ms`, in whole seconds, never below one.
///
/// Stores reject a zero TTL, and a token that is already stale is still
/// worth one second of deduplication.
pub fn cache_ttl_secs(expires_at_ms: i64, now_secs: i64) -> u64 {
    let ttl = expires_at_ms / 1000 - now_secs;
    u64::try_from(ttl).unwrap_or(0).max(1)
}

fn unix_now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_ttl_secs_is_expiry_minus_now() {
        assert_eq!(cache_ttl_secs(1_700_003_600_000, 1_700_000_000), 3600);
        // Sub-second remainder of the expiry is truncated.
        assert_eq!(cache_ttl_secs(1_700_003_600_999, 1_700_000_000), 3600);
    }

    #[test]
    fn test_cache_ttl_secs_clamps_stale_expiry() {
        assert_eq!(cache_ttl_secs(1_000, 1_700_000_000), 1);
        assert_eq!(cache_ttl_secs(1_700_000_000_000, 1_700_000_000), 1);
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential::with_expiry("secret-token", 42);
        let debug = format!("{credential:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("42"));
    }

    #[test]
    fn test_credential_bearer() {
        assert_eq!(Credential::new("T1").bearer(), "Bearer T1");
        assert_eq!(Credential::new("T1").expires_at_ms(), None);
    }
}
