//! The relay bridge: one client socket paired with one dealer socket.
//!
//! A [`RelaySession`] runs on its own task as a single `select!` loop over
//! both connections, so its events never interleave with another
//! session's and never race each other. The flow is:
//!   1. Dealer handshake (first connection id) → register device → push
//!      the filtered player state from the returned cluster
//!   2. Cluster pushes → filter → push
//!   3. First close or error on either side → close the other side once
//!
//! Failures while handling a single dealer frame (registration, enrichment,
//! malformed payloads) are logged and the frame is dropped. Only the
//! sockets themselves can end a session.

use std::sync::Arc;

use dealer_relay_protocol::{Codec, DealerEnvelope, DealerMessage, JsonCodec};
use dealer_relay_session::{Bootstrapper, Credential, TrackMetadata};
use dealer_relay_transport::{Connection, TransportError};
use serde_json::Value;

use crate::filter::StateFilter;

// ---------------------------------------------------------------------------
// BridgeState
// ---------------------------------------------------------------------------

/// Lifecycle of a relay session.
///
/// ```text
/// Connecting → Bridged → Closing → Closed
/// ```
///
/// - **Connecting**: the dealer socket is being opened. Failures here
///   never reach a `RelaySession`; the upgrade request is answered with an
///   error instead.
/// - **Bridged**: both sockets live. Left on the first close/error.
/// - **Closing**: the peer of the side that ended is being closed.
/// - **Closed**: nothing more is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Connecting,
    Bridged,
    Closing,
    Closed,
}

impl BridgeState {
    /// The only state this one may move to, `None` once closed.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Connecting => Some(Self::Bridged),
            Self::Bridged => Some(Self::Closing),
            Self::Closing => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Bridged => write!(f, "Bridged"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// RelayServices
// ---------------------------------------------------------------------------

/// Collaborators shared by every session of a server.
pub struct RelayServices<M> {
    pub(crate) bootstrapper: Bootstrapper,
    pub(crate) filter: StateFilter<M>,
    pub(crate) codec: JsonCodec,
}

impl<M: TrackMetadata> RelayServices<M> {
    /// Bundles the bootstrapper with a filter over `metadata`.
    pub fn new(bootstrapper: Bootstrapper, metadata: M) -> Self {
        Self {
            bootstrapper,
            filter: StateFilter::new(metadata),
            codec: JsonCodec,
        }
    }

    /// The bootstrapper used for dealer sockets and registration.
    pub fn bootstrapper(&self) -> &Bootstrapper {
        &self.bootstrapper
    }
}

// ---------------------------------------------------------------------------
// RelaySession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Client,
    Backend,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Backend => write!(f, "dealer"),
        }
    }
}

enum Event {
    Backend(Result<Option<String>, TransportError>),
    Client(Result<Option<String>, TransportError>),
}

/// A client socket bridged to a dealer socket.
pub struct RelaySession<C, B, M> {
    client: C,
    backend: B,
    credential: Credential,
    services: Arc<RelayServices<M>>,
    state: BridgeState,
    connection_id: Option<String>,
}

impl<C, B, M> RelaySession<C, B, M>
where
    C: Connection,
    B: Connection,
    M: TrackMetadata,
{
    /// Pairs an accepted client socket with an open dealer socket.
    pub fn new(
        client: C,
        backend: B,
        credential: Credential,
        services: Arc<RelayServices<M>>,
    ) -> Self {
        Self {
            client,
            backend,
            credential,
            services,
            state: BridgeState::Connecting,
            connection_id: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Relays until either side closes or errors.
    pub async fn run(mut self) {
        self.advance(BridgeState::Bridged);
        tracing::info!(client = %self.client.id(), dealer = %self.backend.id(), "relay bridged");

        while self.state == BridgeState::Bridged {
            let event = tokio::select! {
                frame = self.backend.recv() => Event::Backend(frame),
                frame = self.client.recv() => Event::Client(frame),
            };

            match event {
                Event::Backend(Ok(Some(text))) => self.on_backend_frame(&text).await,
                Event::Client(Ok(Some(_))) => {
                    tracing::trace!(client = %self.client.id(), "ignoring client frame");
                }
                Event::Backend(Ok(None)) => self.shutdown(Side::Backend, None).await,
                Event::Client(Ok(None)) => self.shutdown(Side::Client, None).await,
                Event::Backend(Err(e)) => self.shutdown(Side::Backend, Some(e)).await,
                Event::Client(Err(e)) => self.shutdown(Side::Client, Some(e)).await,
            }
        }

        tracing::info!(client = %self.client.id(), "relay closed");
    }

    fn advance(&mut self, next: BridgeState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid bridge transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(client = %self.client.id(), from = %self.state, to = %next, "bridge state");
        self.state = next;
    }

    /// Closes the peer of `origin`. Only the first call does anything.
    async fn shutdown(&mut self, origin: Side, error: Option<TransportError>) {
        if self.state != BridgeState::Bridged {
            return;
        }

        match &error {
            Some(e) => tracing::warn!(client = %self.client.id(), side = %origin, error = %e, "socket error"),
            None => tracing::info!(client = %self.client.id(), side = %origin, "socket closed"),
        }

        self.advance(BridgeState::Closing);
        let result = match origin {
            Side::Backend => self.client.close().await,
            Side::Client => self.backend.close().await,
        };
        if let Err(e) = result {
            tracing::debug!(client = %self.client.id(), error = %e, "close of peer failed");
        }
        self.advance(BridgeState::Closed);
    }

    async fn on_backend_frame(&mut self, text: &str) {
        let envelope: DealerEnvelope = match self.services.codec.decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(dealer = %self.backend.id(), error = %e, "dropping undecodable frame");
                return;
            }
        };

        match envelope.classify(self.connection_id.is_some()) {
            Ok(DealerMessage::Handshake { connection_id }) => {
                self.on_handshake(connection_id).await;
            }
            Ok(DealerMessage::ClusterUpdate { player_state }) => {
                self.forward(player_state).await;
            }
            Ok(DealerMessage::Ignored) => {}
            Err(e) => {
                tracing::debug!(dealer = %self.backend.id(), error = %e, "dropping dealer frame");
            }
        }
    }

    /// Registers the device for this session's connection id. Runs at most
    /// once: the id is recorded before the attempt, so a failed
    /// registration is not retried by a repeated handshake.
    async fn on_handshake(&mut self, connection_id: String) {
        tracing::info!(client = %self.client.id(), %connection_id, "dealer handshake");
        self.connection_id = Some(connection_id.clone());

        let cluster = match self
            .services
            .bootstrapper
            .bind_connection(&connection_id, &self.credential)
            .await
        {
            Ok(cluster) => cluster,
            Err(e) => {
                tracing::error!(%connection_id, error = %e, "device registration failed");
                return;
            }
        };

        self.forward(cluster.player_state).await;
    }

    async fn forward(&mut self, player_state: Value) {
        let filtered = match self
            .services
            .filter
            .filter(player_state, &self.credential)
            .await
        {
            Ok(filtered) => filtered,
            Err(e) => {
                tracing::warn!(client = %self.client.id(), error = %e, "dropping player state");
                return;
            }
        };

        let text = match self.services.codec.encode(&filtered) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode player state");
                return;
            }
        };

        if let Err(e) = self.client.send(&text).await {
            self.shutdown(Side::Client, Some(e)).await;
        }
    }
}
