//! Relay configuration, read from the environment.

use dealer_relay_session::{BootstrapOptions, Endpoints};

use crate::RelayError;

/// Where non-WebSocket requests to the relay endpoint are sent.
pub const DEFAULT_REDIRECT_URL: &str = "https://www.youtube.com/watch?v=FfnQemkjPjM";

/// Everything the relay needs to run.
///
/// The session cookie header and the credential store are the only inputs
/// without a sensible default.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen address, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,
    /// Raw `Cookie` header of a logged-in web session.
    pub cookies: String,
    /// Redis URL of the credential cache.
    pub redis_url: String,
    /// Redirect target for plain HTTP requests.
    pub redirect_url: String,
    /// Backend base URLs.
    pub endpoints: Endpoints,
    /// Best-effort calls after connect-state registration.
    pub bootstrap: BootstrapOptions,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            cookies: String::new(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            endpoints: Endpoints::default(),
            bootstrap: BootstrapOptions::default(),
        }
    }
}

impl RelayConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `SP_COOKIES` | required |
    /// | `RELAY_BIND_ADDR` | `0.0.0.0:8080` |
    /// | `REDIS_URL` | `redis://127.0.0.1:6379` |
    /// | `RELAY_REDIRECT_URL` | placeholder video |
    /// | `RELAY_SUBSCRIBE_NOTIFICATIONS` | `false` |
    /// | `RELAY_TRACK_PLAYBACK` | `false` |
    /// | `SPOTIFY_IDENTITY_URL`, `SPOTIFY_DEALER_URL`, `SPOTIFY_SPCLIENT_URL`, `SPOTIFY_API_URL` | production hosts |
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cookies = lookup("SP_COOKIES")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| RelayError::Config("SP_COOKIES is not set".into()))?;

        let flag = |key: &str| {
            lookup(key)
                .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };
        let url = |key: &str, default: String| {
            lookup(key)
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(default)
        };

        Ok(Self {
            bind_addr: lookup("RELAY_BIND_ADDR").unwrap_or(defaults.bind_addr),
            cookies,
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            redirect_url: lookup("RELAY_REDIRECT_URL").unwrap_or(defaults.redirect_url),
            endpoints: Endpoints {
                identity: url("SPOTIFY_IDENTITY_URL", defaults.endpoints.identity),
                dealer: url("SPOTIFY_DEALER_URL", defaults.endpoints.dealer),
                spclient: url("SPOTIFY_SPCLIENT_URL", defaults.endpoints.spclient),
                api: url("SPOTIFY_API_URL", defaults.endpoints.api),
            },
            bootstrap: BootstrapOptions {
                subscribe_notifications: flag("RELAY_SUBSCRIBE_NOTIFICATIONS"),
                track_playback: flag("RELAY_TRACK_PLAYBACK"),
            },
        })
    }
}
