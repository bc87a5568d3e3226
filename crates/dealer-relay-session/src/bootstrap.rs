//! Dealer session bootstrap.
//!
//! Opening a relay session against the backend happens in two phases:
//!
//! 1. Before the bridge exists: build the dealer URL from the credential
//!    and open the dealer socket ([`Bootstrapper::dealer_url`],
//!    [`Bootstrapper::open_backend`]).
//! 2. After the dealer announces a connection id: register the virtual
//!    device with connect-state, which answers with the cluster that seeds
//!    the first state pushed to the client ([`Bootstrapper::bind_connection`]).

use dealer_relay_protocol::Cluster;
use dealer_relay_transport::{DealerConnection, TransportError};
use reqwest::Client;
use serde_json::json;

use crate::endpoints::with_browser_headers;
use crate::{Credential, DeviceDescriptor, Endpoints, SessionError, default_device};

/// Client version reported to track-playback.
pub const CLIENT_VERSION: &str = "harmony:4.21.0-a4bc573";

/// Header carrying the dealer connection id on connect-state calls.
pub const CONNECTION_ID_HEADER: &str = "X-Spotify-Connection-ID";

/// Which best-effort calls follow connect-state registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Bind the connection id to the user's notification feed.
    pub subscribe_notifications: bool,
    /// Register the device with track-playback.
    pub track_playback: bool,
}

/// Performs the backend calls that turn a dealer socket into a live
/// connect-state session.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    client: Client,
    endpoints: Endpoints,
    options: BootstrapOptions,
}

impl Bootstrapper {
    /// Creates a bootstrapper for the given backend.
    pub fn new(client: Client, endpoints: Endpoints, options: BootstrapOptions) -> Self {
        Self {
            client,
            endpoints,
            options,
        }
    }

    /// The configured endpoints.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Builds the dealer socket URL for `credential`.
    pub fn dealer_url(&self, credential: &Credential) -> String {
        let token: String =
            url::form_urlencoded::byte_serialize(credential.token().as_bytes()).collect();
        format!("{}/?access_token={token}", self.endpoints.dealer)
    }

    /// Opens the dealer socket.
    ///
    /// # Errors
    /// [`TransportError::UpgradeFailure`] if the dealer answers without
    /// switching protocols, [`TransportError::ConnectFailed`] if it cannot
    /// be reached.
    pub async fn open_backend(&self, url: &str) -> Result<DealerConnection, TransportError> {
        DealerConnection::connect_with(&self.client, url).await
    }

    /// Registers the process-wide device for `connection_id` and runs the
    /// optional follow-up calls.
    ///
    /// Only registration is fatal. Subscription and track-playback
    /// failures are logged and swallowed: they affect push entitlement,
    /// not the dealer channel.
    pub async fn bind_connection(
        &self,
        connection_id: &str,
        credential: &Credential,
    ) -> Result<Cluster, SessionError> {
        let device = default_device();
        let cluster = self.register_device(connection_id, credential, device).await?;

        if self.options.subscribe_notifications {
            if let Err(e) = self.subscribe_notifications(connection_id, credential).await {
                tracing::warn!(%connection_id, error = %e, "notification subscription failed");
            }
        }

        if self.options.track_playback {
            if let Err(e) = self.track_playback(connection_id, credential, device).await {
                tracing::warn!(%connection_id, error = %e, "track-playback registration failed");
            }
        }

        Ok(cluster)
    }

    /// `PUT /connect-state/v1/devices/hobs_<device_id>`: declares the device
    /// hidden, non-playable, and in need of full player state.
    ///
    /// # Errors
    /// [`SessionError::RegistrationFailure`] on any status but `200 OK`.
    pub async fn register_device(
        &self,
        connection_id: &str,
        credential: &Credential,
        device: &DeviceDescriptor,
    ) -> Result<Cluster, SessionError> {
        let body = json!({
            "device": {
                "device_info": {
                    "capabilities": {
                        "can_be_player": false,
                        "hidden": true,
                        "needs_full_player_state": true
                    }
                }
            },
            "member_type": "CONNECT_STATE"
        });

        let request = self
            .client
            .put(format!(
                "{}/connect-state/v1/devices/hobs_{}",
                self.endpoints.spclient, device.device_id
            ))
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .header(CONNECTION_ID_HEADER, connection_id)
            .json(&body);

        let response = with_browser_headers(request).send().await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%connection_id, status, %body, "connect-state registration refused");
            return Err(SessionError::RegistrationFailure { status, body });
        }

        tracing::info!(%connection_id, device_id = %device.device_id, "device registered");
        Ok(response.json().await?)
    }

    /// `PUT /v1/me/notifications/user?connection_id=...`.
    ///
    /// # Errors
    /// [`SessionError::SubscriptionFailure`] on any status but `204`.
    pub async fn subscribe_notifications(
        &self,
        connection_id: &str,
        credential: &Credential,
    ) -> Result<(), SessionError> {
        let request = self
            .client
            .put(format!("{}/v1/me/notifications/user", self.endpoints.api))
            .query(&[("connection_id", connection_id)])
            .header(reqwest::header::AUTHORIZATION, credential.bearer());

        let response = with_browser_headers(request).send().await?;

        let status = response.status().as_u16();
        if status != 204 {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::SubscriptionFailure { status, body });
        }
        Ok(())
    }

    /// `POST /track-playback/v1/devices`.
    ///
    /// # Errors
    /// [`SessionError::TrackPlaybackFailure`] on any status but `204`.
    pub async fn track_playback(
        &self,
        connection_id: &str,
        credential: &Credential,
        device: &DeviceDescriptor,
    ) -> Result<(), SessionError> {
        let body = json!({
            "client_version": CLIENT_VERSION,
            "connection_id": connection_id,
            "device": device,
            "outro_endcontent_snooping": false,
            "volume": 65535
        });

        let request = self
            .client
            .post(format!("{}/track-playback/v1/devices", self.endpoints.spclient))
            .header(reqwest::header::ORIGIN, "https://open.spotify.com")
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .json(&body);

        let response = with_browser_headers(request).send().await?;

        let status = response.status().as_u16();
        if status != 204 {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::TrackPlaybackFailure { status, body });
        }
        Ok(())
    }
}
