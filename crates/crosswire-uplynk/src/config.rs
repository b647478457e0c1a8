//! Uplynk SSAI source configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content class of an Uplynk playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UplynkAssetType {
    /// Video-on-demand asset
    #[default]
    Asset,
    /// Live linear channel
    Channel,
    /// Live event
    Event,
}

impl UplynkAssetType {
    /// Live sessions receive their ad breaks through ping, not preplay
    pub fn is_live(&self) -> bool {
        matches!(self, UplynkAssetType::Channel | UplynkAssetType::Event)
    }

    /// URL path segment for this asset type
    pub fn path_segment(&self) -> Option<&'static str> {
        match self {
            UplynkAssetType::Asset => None,
            UplynkAssetType::Channel => Some("channel"),
            UplynkAssetType::Event => Some("event"),
        }
    }
}

/// Which ping features the session opts into
///
/// Feature applicability depends on the stream class: ad impressions are
/// VOD-only, linear ad data is live-only, FreeWheel video views apply to
/// both. [`PingFeatures`](crate::ping::PingFeatures) resolves the effective
/// set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PingConfiguration {
    /// Report ad impressions as the playhead crosses them (VOD)
    pub ad_impressions: bool,
    /// Report FreeWheel video views, including seek notifications
    pub freewheel_video_views: bool,
    /// Receive linear ad data through ping responses (live)
    pub linear_ad_data: bool,
}

/// SSAI payload carried by a typed source claimed by the Uplynk connector
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UplynkSsaiDescription {
    /// Platform prefix; defaults to the public content endpoint
    pub prefix: Option<String>,
    /// Uplynk asset GUIDs
    pub asset_ids: Vec<String>,
    /// Owner-scoped external IDs; require `user_id`
    pub external_ids: Vec<String>,
    /// Owner user ID, required with `external_ids`
    pub user_id: Option<String>,
    /// Content class of the session
    pub asset_type: UplynkAssetType,
    /// Request a protected (DRM) playback session
    pub content_protected: bool,
    /// Ping feature opt-ins
    pub ping_configuration: PingConfiguration,
    /// Free-form preplay query parameters, appended in key order
    pub preplay_parameters: BTreeMap<String, String>,
    /// Fetch asset info for each asset after session resolution
    pub asset_info: bool,
}

impl UplynkSsaiDescription {
    /// Description for a single VOD asset
    pub fn asset(asset_id: impl Into<String>) -> Self {
        Self {
            asset_ids: vec![asset_id.into()],
            ..Default::default()
        }
    }

    /// Description for a live channel
    pub fn channel(channel_id: impl Into<String>) -> Self {
        Self {
            asset_ids: vec![channel_id.into()],
            asset_type: UplynkAssetType::Channel,
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_ping(mut self, ping: PingConfiguration) -> Self {
        self.ping_configuration = ping;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.preplay_parameters.insert(key.into(), value.into());
        self
    }
}
