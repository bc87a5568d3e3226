//! # dealer-relay
//!
//! Bridges a browser WebSocket to the provider's dealer push channel and
//! forwards a trimmed, enriched player state.
//!
//! For every browser connection the relay resolves an access token, opens
//! the dealer socket with it, registers a hidden virtual device once the
//! dealer hands out a connection id, and from then on turns each cluster
//! update into a [`FilteredState`](dealer_relay_protocol::FilteredState)
//! sent down the browser socket.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dealer_relay::prelude::*;
//!
//! # async fn start() -> Result<(), RelayError> {
//! let config = RelayConfig::from_env()?;
//! let cache = RedisCredentialCache::connect(&config.redis_url).await?;
//! let metadata = HttpTrackMetadata::new(reqwest::Client::new(), config.endpoints.api.clone());
//!
//! let server = RelayServer::builder(config).build(cache, metadata).await?;
//! server.run().await
//! # }
//! ```

mod bridge;
mod config;
mod error;
mod filter;
mod server;

pub use bridge::{BridgeState, RelayServices, RelaySession};
pub use config::{DEFAULT_REDIRECT_URL, RelayConfig};
pub use error::RelayError;
pub use filter::StateFilter;
pub use server::{RelayServer, RelayServerBuilder};

/// Everything needed to configure and start a relay.
pub mod prelude {
    pub use crate::{RelayConfig, RelayError, RelayServer, RelayServerBuilder};
    pub use dealer_relay_protocol::FilteredState;
    pub use dealer_relay_session::{
        BootstrapOptions, Credential, CredentialCache, Endpoints, HttpTrackMetadata,
        RedisCredentialCache, SessionError, TrackDescriptor, TrackMetadata,
    };
}
