//! The virtual player the relay registers with connect-state.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of a generated device id.
pub const DEVICE_ID_LEN: usize = 40;

const DEVICE_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static DEFAULT_DEVICE: LazyLock<DeviceDescriptor> = LazyLock::new(DeviceDescriptor::web_player);

/// What the virtual player claims it can do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub audio_podcasts: bool,
    pub change_volume: bool,
    pub disable_connect: bool,
    pub enable_play_token: bool,
    pub manifest_formats: Vec<String>,
    pub play_token_lost_behavior: String,
    pub supports_file_media_type: bool,
    pub video_playback: bool,
}

/// Identity and capabilities of the virtual player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub brand: String,
    pub capabilities: Capabilities,
    pub device_id: String,
    pub device_type: String,
    pub metadata: BTreeMap<String, String>,
    pub model: String,
    pub name: String,
    pub platform_identifier: String,
}

impl DeviceDescriptor {
    /// A desktop web player with a fresh random device id.
    pub fn web_player() -> Self {
        Self {
            brand: "spotify".into(),
            capabilities: Capabilities {
                audio_podcasts: true,
                change_volume: true,
                disable_connect: true,
                enable_play_token: true,
                manifest_formats: [
                    "file_urls_mp3",
                    "manifest_ids_video",
                    "file_urls_external",
                    "file_ids_mp4",
                    "file_ids_mp4_dual",
                ]
                .map(String::from)
                .to_vec(),
                play_token_lost_behavior: "pause".into(),
                supports_file_media_type: true,
                video_playback: true,
            },
            device_id: generate_device_id(),
            device_type: "computer".into(),
            metadata: BTreeMap::new(),
            model: "web_player".into(),
            name: "Web Player (Microsoft Edge)".into(),
            platform_identifier: "web_player osx 11.3.0;microsoft edge 89.0.774.54;desktop"
                .into(),
        }
    }
}

/// The process-wide device. Built on first use; the id never changes after.
pub fn default_device() -> &'static DeviceDescriptor {
    &DEFAULT_DEVICE
}

/// Generates a 40-character lowercase base-36 id.
fn generate_device_id() -> String {
    let mut rng = rand::rng();
    (0..DEVICE_ID_LEN)
        .map(|_| {
            let idx = rng.random_range(0..DEVICE_ID_ALPHABET.len());
            DEVICE_ID_ALPHABET[idx] as char
        })
        .collect()
}
