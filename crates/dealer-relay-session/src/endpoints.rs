//! Backend base URLs and the browser headers every request carries.

use reqwest::RequestBuilder;

/// User agent of the web player build the relay impersonates.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36";

/// Headers a same-origin fetch from the web player would send.
pub const BROWSER_HEADERS: [(&str, &str); 5] = [
    ("referer", "https://open.spotify.com/"),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
    ("user-agent", USER_AGENT),
];

/// Adds [`BROWSER_HEADERS`] to a request.
pub(crate) fn with_browser_headers(mut request: RequestBuilder) -> RequestBuilder {
    for (name, value) in BROWSER_HEADERS {
        request = request.header(name, value);
    }
    request
}

/// Base URLs of every backend service the relay calls.
///
/// No trailing slash. Tests point these at local mock servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Issues access tokens from session cookies.
    pub identity: String,
    /// The dealer WebSocket (`wss://` in production).
    pub dealer: String,
    /// Connect-state and track-playback services.
    pub spclient: String,
    /// Public Web API (notifications, track metadata).
    pub api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            identity: "https://open.spotify.com".to_string(),
            dealer: "wss://guc3-dealer.spotify.com:443".to_string(),
            spclient: "https://guc3-spclient.spotify.com".to_string(),
            api: "https://api.spotify.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Points every service at one base URL, with the dealer on the
    /// matching `ws://` scheme. Handy for local stubs.
    pub fn all_at(http_base: &str) -> Self {
        let base = http_base.trim_end_matches('/');
        let dealer = base
            .strip_prefix("https://")
            .map(|rest| format!("wss://{rest}"))
            .or_else(|| base.strip_prefix("http://").map(|rest| format!("ws://{rest}")))
            .unwrap_or_else(|| base.to_string());
        Self {
            identity: base.to_string(),
            dealer,
            spclient: base.to_string(),
            api: base.to_string(),
        }
    }
}
