//! `RelayServer` builder and HTTP surface.
//!
//! One endpoint does the real work. A request to `/` that asks for a
//! WebSocket upgrade gets a credential, a dealer socket, and then the
//! upgrade; anything else is redirected. The `101 Switching Protocols`
//! is only sent once the dealer socket is open, so a dealer refusal
//! reaches the browser as a plain `500` carrying the reason.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use dealer_relay_session::{Bootstrapper, CredentialCache, CredentialProvider, TrackMetadata};
use dealer_relay_transport::{ClientConnection, Connection, DealerConnection};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::bridge::{RelayServices, RelaySession};
use crate::{RelayConfig, RelayError};

/// Shared state behind every request.
pub(crate) struct RelayState<K, M> {
    pub(crate) cookies: String,
    pub(crate) redirect_url: String,
    pub(crate) credentials: CredentialProvider,
    pub(crate) cache: K,
    pub(crate) services: Arc<RelayServices<M>>,
}

/// Builder for a [`RelayServer`].
///
/// # Example
///
/// ```rust,ignore
/// use dealer_relay::prelude::*;
///
/// let config = RelayConfig::from_env()?;
/// let cache = RedisCredentialCache::connect(&config.redis_url).await?;
/// let metadata = HttpTrackMetadata::new(reqwest::Client::new(), config.endpoints.api.clone());
/// let server = RelayServer::builder(config).build(cache, metadata).await?;
/// server.run().await
/// ```
pub struct RelayServerBuilder {
    config: RelayConfig,
}

impl RelayServerBuilder {
    /// Creates a builder from a loaded configuration.
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Overrides the listen address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and wires the relay around `cache` and
    /// `metadata`.
    pub async fn build<K, M>(self, cache: K, metadata: M) -> Result<RelayServer, RelayError>
    where
        K: CredentialCache,
        M: TrackMetadata,
    {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        let client = reqwest::Client::new();

        let bootstrapper = Bootstrapper::new(
            client.clone(),
            self.config.endpoints.clone(),
            self.config.bootstrap,
        );
        let state = Arc::new(RelayState {
            cookies: self.config.cookies,
            redirect_url: self.config.redirect_url,
            credentials: CredentialProvider::new(client, self.config.endpoints.identity),
            cache,
            services: Arc::new(RelayServices::new(bootstrapper, metadata)),
        });

        Ok(RelayServer {
            listener,
            router: router(state),
        })
    }
}

fn router<K, M>(state: Arc<RelayState<K, M>>) -> Router
where
    K: CredentialCache,
    M: TrackMetadata,
{
    Router::new()
        .route("/", any(relay::<K, M>))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A bound relay, ready to serve.
pub struct RelayServer {
    listener: TcpListener,
    router: Router,
}

impl RelayServer {
    /// Creates a builder.
    pub fn builder(config: RelayConfig) -> RelayServerBuilder {
        RelayServerBuilder::new(config)
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until the process is terminated.
    pub async fn run(self) -> Result<(), RelayError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves, then stops accepting requests.
    /// Already-bridged sessions keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "dealer relay listening");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("dealer relay stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> &'static str {
    "ok"
}

fn wants_websocket(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"))
}

async fn relay<K, M>(
    State(state): State<Arc<RelayState<K, M>>>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response
where
    K: CredentialCache,
    M: TrackMetadata,
{
    if !wants_websocket(&headers) {
        return (
            StatusCode::FOUND,
            [(header::LOCATION, state.redirect_url.clone())],
        )
            .into_response();
    }

    // An upgrade request axum cannot complete is refused before any
    // backend work.
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let credential = match state.credentials.resolve(&state.cache, &state.cookies).await {
        Ok(credential) => credential,
        Err(e) => {
            tracing::error!(error = %e, "could not obtain access token");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let bootstrapper = state.services.bootstrapper();
    let backend = match bootstrapper
        .open_backend(&bootstrapper.dealer_url(&credential))
        .await
    {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(error = %e, "dealer refused connection");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let services = Arc::clone(&state.services);
    let pending = PendingBackend::new(backend);
    upgrade
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "client upgrade failed"))
        .on_upgrade(move |socket| async move {
            let Some(backend) = pending.take() else {
                return;
            };
            RelaySession::new(ClientConnection::new(socket), backend, credential, services)
                .run()
                .await;
        })
}

/// A dealer socket waiting for the client upgrade to complete.
///
/// If the upgrade fails, axum drops the callback holding this guard, and
/// the dealer socket is closed instead of just being dropped. Since `Drop`
/// is synchronous, the close runs on a fire-and-forget task.
struct PendingBackend {
    backend: Option<DealerConnection>,
}

impl PendingBackend {
    fn new(backend: DealerConnection) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Hands the socket over to a session; the guard no longer closes it.
    fn take(mut self) -> Option<DealerConnection> {
        self.backend.take()
    }
}

impl Drop for PendingBackend {
    fn drop(&mut self) {
        let Some(backend) = self.backend.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        runtime.spawn(async move {
            tracing::debug!(dealer = %backend.id(), "closing dealer socket of failed upgrade");
            if let Err(e) = backend.close().await {
                tracing::debug!(error = %e, "close of dealer socket failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;
    use futures_util::StreamExt;
    use tokio_tungstenite::tungstenite::Message;

    use super::*;

    /// Opens a dealer socket to a local server and returns what the server
    /// sees first: the text of a frame, `"close"` for a close frame, or
    /// `"eof"` for a socket dropped without one.
    async fn dealer_pair() -> (DealerConnection, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let observed = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            match ws.next().await {
                Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                Some(Ok(Message::Close(_))) => "close".to_owned(),
                _ => "eof".to_owned(),
            }
        });
        let backend = DealerConnection::connect(&format!("ws://{addr}/")).await.unwrap();
        (backend, observed)
    }

    #[tokio::test]
    async fn test_pending_backend_dropped_closes_dealer_socket() {
        let (backend, observed) = dealer_pair().await;

        drop(PendingBackend::new(backend));

        let first = tokio::time::timeout(Duration::from_secs(5), observed)
            .await
            .expect("dealer should observe the close")
            .unwrap();
        assert_eq!(first, "close");
    }

    #[tokio::test]
    async fn test_pending_backend_taken_stays_open() {
        let (backend, observed) = dealer_pair().await;

        let backend = PendingBackend::new(backend).take().unwrap();
        backend.send("still open").await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), observed)
            .await
            .expect("dealer should receive the frame")
            .unwrap();
        assert_eq!(first, "still open");
    }

    #[test]
    fn test_wants_websocket_matches_case_insensitively() {
        let mut headers = HeaderMap::new();
        assert!(!wants_websocket(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(wants_websocket(&headers));

        headers.insert(header::UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!wants_websocket(&headers));
    }
}
