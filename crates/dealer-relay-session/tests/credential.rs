//! Integration tests for credential resolution against a mocked identity
//! endpoint.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use dealer_relay_session::{
    ACCESS_TOKEN_KEY, CredentialCache, CredentialProvider, SessionError,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =========================================================================
// Test cache
// =========================================================================

/// Records every write; never evicts.
#[derive(Default)]
struct RecordingCache {
    entries: Mutex<HashMap<String, String>>,
    puts: Mutex<Vec<(String, String, u64)>>,
}

impl RecordingCache {
    fn holding(token: &str) -> Self {
        let cache = Self::default();
        cache
            .entries
            .lock()
            .unwrap()
            .insert(ACCESS_TOKEN_KEY.to_string(), token.to_string());
        cache
    }

    fn puts(&self) -> Vec<(String, String, u64)> {
        self.puts.lock().unwrap().clone()
    }
}

impl CredentialCache for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), SessionError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.puts
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string(), ttl_secs));
        Ok(())
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_resolve_cache_hit_skips_identity_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_access_token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = CredentialProvider::new(reqwest::Client::new(), server.uri());
    let cache = RecordingCache::holding("CACHED");

    let credential = provider.resolve(&cache, "sp_dc=abc").await.unwrap();

    assert_eq!(credential.token(), "CACHED");
    assert_eq!(credential.expires_at_ms(), None);
    assert!(cache.puts().is_empty());
}

#[tokio::test]
async fn test_resolve_cache_miss_fetches_once_and_writes_with_ttl() {
    let server = MockServer::start().await;
    let expires = now_ms() + 3_600_000;
    Mock::given(method("GET"))
        .and(path("/get_access_token"))
        .and(query_param("reason", "transport"))
        .and(query_param("productType", "web_player"))
        .and(header("cookie", "sp_dc=abc; sp_key=def"))
        .and(header("referer", "https://open.spotify.com/"))
        .and(header("sec-fetch-mode", "cors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clientId": "ignored",
            "accessToken": "T1",
            "accessTokenExpirationTimestampMs": expires,
            "isAnonymous": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = CredentialProvider::new(reqwest::Client::new(), server.uri());
    let cache = RecordingCache::default();

    let credential = provider.resolve(&cache, "sp_dc=abc; sp_key=def").await.unwrap();

    assert_eq!(credential.token(), "T1");
    assert_eq!(credential.expires_at_ms(), Some(expires));

    let puts = cache.puts();
    assert_eq!(puts.len(), 1, "exactly one cache write");
    let (key, value, ttl) = &puts[0];
    assert_eq!(key, "access_token");
    assert_eq!(value, "T1");
    assert!((3599..=3600).contains(ttl), "ttl was {ttl}");
}

#[tokio::test]
async fn test_resolve_second_call_uses_cached_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "T1",
            "accessTokenExpirationTimestampMs": now_ms() + 60_000
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = CredentialProvider::new(reqwest::Client::new(), server.uri());
    let cache = RecordingCache::default();

    let first = provider.resolve(&cache, "c").await.unwrap();
    let second = provider.resolve(&cache, "c").await.unwrap();

    assert_eq!(first.token(), second.token());
    assert_eq!(cache.puts().len(), 1);
}

#[tokio::test]
async fn test_resolve_non_200_is_auth_failure_with_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_access_token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("cookie expired"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = CredentialProvider::new(reqwest::Client::new(), server.uri());
    let cache = RecordingCache::default();

    let err = provider.resolve(&cache, "stale").await.unwrap_err();

    match err {
        SessionError::AuthFailure { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "cookie expired");
        }
        other => panic!("expected AuthFailure, got {other}"),
    }
    assert!(cache.puts().is_empty(), "failed fetch must not touch the cache");
}
