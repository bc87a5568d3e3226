//! Credential resolution and dealer session bootstrap for dealer-relay.
//!
//! This crate owns every HTTP conversation with the backend:
//!
//! 1. **Credentials**: [`CredentialProvider`] resolves an access token
//!    through a [`CredentialCache`] (Redis in production,
//!    [`RedisCredentialCache`]).
//! 2. **Bootstrap**: [`Bootstrapper`] builds the dealer URL, opens the
//!    dealer socket, and registers the virtual [`DeviceDescriptor`] once the
//!    dealer hands out a connection id.
//! 3. **Metadata**: [`TrackMetadata`] describes the track a player state
//!    points at.
//!
//! # How it fits in the stack
//!
//! ```text
//! Relay (above)     ← drives bootstrap from inside the bridge
//!     ↕
//! Session (this crate)
//!     ↕
//! Transport / Protocol (below)  ← dealer socket, cluster type
//! ```

mod bootstrap;
mod cache;
mod credential;
mod device;
mod endpoints;
mod error;
mod metadata;

pub use bootstrap::{BootstrapOptions, Bootstrapper, CLIENT_VERSION, CONNECTION_ID_HEADER};
pub use cache::RedisCredentialCache;
pub use credential::{
    ACCESS_TOKEN_KEY, Credential, CredentialCache, CredentialProvider, cache_ttl_secs,
};
pub use device::{Capabilities, DEVICE_ID_LEN, DeviceDescriptor, default_device};
pub use endpoints::{BROWSER_HEADERS, Endpoints, USER_AGENT};
pub use error::SessionError;
pub use metadata::{HttpTrackMetadata, TrackDescriptor, TrackMetadata};
