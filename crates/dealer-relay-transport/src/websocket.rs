//! Outbound dealer socket.
//!
//! The upgrade request goes out through `reqwest` so that a refusal can be
//! read like any other HTTP response, body included. On `101 Switching
//! Protocols` the upgraded stream is handed to `tokio-tungstenite`.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::header::{
    CONNECTION, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY, SEC_WEBSOCKET_VERSION, UPGRADE,
};
use reqwest::{Client, StatusCode, Upgraded};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;

use crate::{Connection, ConnectionId, TransportError};

type WsStream = WebSocketStream<Upgraded>;

/// A client-side WebSocket connection to the dealer.
pub struct DealerConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl DealerConnection {
    /// Performs the WebSocket client handshake against `url` with a fresh
    /// HTTP client.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        Self::connect_with(&Client::new(), url).await
    }

    /// Performs the WebSocket client handshake against `url` (`ws://` or
    /// `wss://`) over `client`.
    ///
    /// A response other than `101 Switching Protocols` yields
    /// [`TransportError::UpgradeFailure`] with the status and the full
    /// response body.
    pub async fn connect_with(client: &Client, url: &str) -> Result<Self, TransportError> {
        let key = generate_key();
        let response = client
            .get(http_url(url)?)
            .header(CONNECTION, "Upgrade")
            .header(UPGRADE, "websocket")
            .header(SEC_WEBSOCKET_VERSION, "13")
            .header(SEC_WEBSOCKET_KEY, &key)
            .send()
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::SWITCHING_PROTOCOLS {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::UpgradeFailure {
                status: status.as_u16(),
                body,
            });
        }

        let accept = response
            .headers()
            .get(SEC_WEBSOCKET_ACCEPT)
            .and_then(|value| value.to_str().ok());
        if accept != Some(derive_accept_key(key.as_bytes()).as_str()) {
            return Err(TransportError::ConnectFailed(
                "dealer answered with a mismatched Sec-WebSocket-Accept".into(),
            ));
        }

        let upgraded = response
            .upgrade()
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        let ws = WebSocketStream::from_raw_socket(upgraded, Role::Client, None).await;

        let id = ConnectionId::next();
        tracing::debug!(%id, "dealer socket open");

        let (sink, stream) = ws.split();
        Ok(Self {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// Maps a WebSocket URL onto the HTTP URL the upgrade request is sent to.
fn http_url(url: &str) -> Result<String, TransportError> {
    if let Some(rest) = url.strip_prefix("wss://") {
        Ok(format!("https://{rest}"))
    } else if let Some(rest) = url.strip_prefix("ws://") {
        Ok(format!("http://{rest}"))
    } else {
        Err(TransportError::ConnectFailed(format!(
            "not a WebSocket URL: {url}"
        )))
    }
}

impl Connection for DealerConnection {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(String::from_utf8_lossy(&data).into_owned()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
