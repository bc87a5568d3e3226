//! Integration tests for connect-state bootstrap and track metadata against
//! mocked backend endpoints.

use dealer_relay_session::{
    BootstrapOptions, Bootstrapper, CLIENT_VERSION, Credential, Endpoints,
    HttpTrackMetadata, SessionError, TrackMetadata, default_device,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =========================================================================
// Helpers
// =========================================================================

fn bootstrapper(server: &MockServer, options: BootstrapOptions) -> Bootstrapper {
    Bootstrapper::new(reqwest::Client::new(), Endpoints::all_at(&server.uri()), options)
}

fn device_path() -> String {
    format!("/connect-state/v1/devices/hobs_{}", default_device().device_id)
}

fn registration_body() -> serde_json::Value {
    json!({
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
    })
}

async fn mount_registration(server: &MockServer, status: u16, expected_calls: u64) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "active_device_id": "abc",
            "player_state": {"is_playing": true, "track": {"uri": "spotify:track:T"}}
        }))
    } else {
        ResponseTemplate::new(status).set_body_string("Device not registered")
    };

    Mock::given(method("PUT"))
        .and(path(device_path()))
        .and(header("x-spotify-connection-id", "C1"))
        .and(header("authorization", "Bearer T1"))
        .and(body_json(registration_body()))
        .respond_with(template)
        .expect(expected_calls)
        .mount(server)
        .await;
}

// =========================================================================
// register_device / bind_connection
// =========================================================================

#[tokio::test]
async fn test_register_device_returns_cluster_on_200() {
    let server = MockServer::start().await;
    mount_registration(&server, 200, 1).await;

    let cluster = bootstrapper(&server, BootstrapOptions::default())
        .register_device("C1", &Credential::new("T1"), default_device())
        .await
        .unwrap();

    assert_eq!(cluster.player_state["is_playing"], json!(true));
    assert_eq!(cluster.rest["active_device_id"], json!("abc"));
}

#[tokio::test]
async fn test_register_device_non_200_is_registration_failure() {
    let server = MockServer::start().await;
    mount_registration(&server, 404, 1).await;

    let err = bootstrapper(&server, BootstrapOptions::default())
        .register_device("C1", &Credential::new("T1"), default_device())
        .await
        .unwrap_err();

    match err {
        SessionError::RegistrationFailure { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Device not registered");
        }
        other => panic!("expected RegistrationFailure, got {other}"),
    }
}

#[tokio::test]
async fn test_bind_connection_skips_optional_calls_by_default() {
    let server = MockServer::start().await;
    mount_registration(&server, 200, 1).await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/notifications/user"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let cluster = bootstrapper(&server, BootstrapOptions::default())
        .bind_connection("C1", &Credential::new("T1"))
        .await
        .unwrap();

    assert_eq!(cluster.player_state["track"]["uri"], "spotify:track:T");
}

#[tokio::test]
async fn test_bind_connection_survives_subscription_failure() {
    let server = MockServer::start().await;
    mount_registration(&server, 200, 1).await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/notifications/user"))
        .and(query_param("connection_id", "C1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/track-playback/v1/devices"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let options = BootstrapOptions {
        subscribe_notifications: true,
        track_playback: true,
    };
    let result = bootstrapper(&server, options)
        .bind_connection("C1", &Credential::new("T1"))
        .await;

    assert!(result.is_ok(), "best-effort calls must not fail the bind");
}

#[tokio::test]
async fn test_bind_connection_propagates_registration_failure() {
    let server = MockServer::start().await;
    mount_registration(&server, 401, 1).await;

    let options = BootstrapOptions {
        subscribe_notifications: true,
        track_playback: false,
    };
    let err = bootstrapper(&server, options)
        .bind_connection("C1", &Credential::new("T1"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::RegistrationFailure { status: 401, .. }));
}

// =========================================================================
// subscribe_notifications / track_playback
// =========================================================================

#[tokio::test]
async fn test_subscribe_notifications_expects_204() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/notifications/user"))
        .and(query_param("connection_id", "C1"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    bootstrapper(&server, BootstrapOptions::default())
        .subscribe_notifications("C1", &Credential::new("T1"))
        .await
        .expect("204 should succeed");
}

#[tokio::test]
async fn test_subscribe_notifications_200_is_still_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/notifications/user"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let err = bootstrapper(&server, BootstrapOptions::default())
        .subscribe_notifications("C1", &Credential::new("T1"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::SubscriptionFailure { status: 200, .. }));
}

#[tokio::test]
async fn test_track_playback_posts_device_descriptor() {
    let server = MockServer::start().await;
    let device = default_device();
    Mock::given(method("POST"))
        .and(path("/track-playback/v1/devices"))
        .and(header("origin", "https://open.spotify.com"))
        .and(body_json(json!({
            "client_version": CLIENT_VERSION,
            "connection_id": "C1",
            "device": device,
            "outro_endcontent_snooping": false,
            "volume": 65535
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    bootstrapper(&server, BootstrapOptions::default())
        .track_playback("C1", &Credential::new("T1"), device)
        .await
        .expect("204 should succeed");
}

// =========================================================================
// HttpTrackMetadata
// =========================================================================

#[tokio::test]
async fn test_track_metadata_returns_descriptor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks/4uLU6hMCjMI75M1A2tKUQC"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let metadata = HttpTrackMetadata::new(reqwest::Client::new(), server.uri());
    let descriptor = metadata
        .track("4uLU6hMCjMI75M1A2tKUQC", &Credential::new("T1"))
        .await
        .unwrap();

    assert_eq!(descriptor.into_value()["name"], "Never Gonna Give You Up");
}

#[tokio::test]
async fn test_track_metadata_failure_is_enrichment_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/tracks/.+$"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let metadata = HttpTrackMetadata::new(reqwest::Client::new(), server.uri());
    let err = metadata
        .track("abc", &Credential::new("T1"))
        .await
        .unwrap_err();

    match err {
        SessionError::EnrichmentFailure { track_id, reason } => {
            assert_eq!(track_id, "abc");
            assert!(reason.contains("429"));
            assert!(reason.contains("slow down"));
        }
        other => panic!("expected EnrichmentFailure, got {other}"),
    }
}

#[tokio::test]
async fn test_track_metadata_escapes_track_id_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a/b"})))
        .expect(1)
        .mount(&server)
        .await;

    let metadata = HttpTrackMetadata::new(reqwest::Client::new(), server.uri());
    let descriptor = metadata
        .track("a/b", &Credential::new("T1"))
        .await
        .unwrap();

    assert_eq!(descriptor.into_value()["id"], "a/b");
}
