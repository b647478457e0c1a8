//! Uplynk wire models
//!
//! Serde mappings for the preplay, ping, and asset-info responses. Field
//! names follow the platform JSON; only the fields the connector consumes
//! are mapped, everything else is ignored on deserialization.

use serde::Deserialize;
use std::collections::HashMap;

/// Response of a preplay session request
#[derive(Debug, Clone, Deserialize)]
pub struct PreplayResponse {
    /// Session-bound playback URL to swap into the player source
    #[serde(rename = "playURL")]
    pub play_url: String,
    /// Session identifier used by ping and session-scoped requests
    pub sid: String,
    /// Session-bound platform prefix; overrides the configured one
    pub prefix: String,
    /// Ad metadata for VOD sessions
    #[serde(default)]
    pub ads: Option<UplynkAds>,
    /// Interstitial playback URL for server-guided insertion
    #[serde(default, rename = "interstitialURL")]
    pub interstitial_url: Option<String>,
    /// DRM parameters when the session is content-protected
    #[serde(default)]
    pub drm: Option<UplynkDrm>,
    /// Platform-side error; a present value fails the session
    #[serde(default)]
    pub error: Option<String>,
}

/// DRM block of a protected preplay response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UplynkDrm {
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "widevineLicenseURL")]
    pub widevine_license_url: Option<String>,
    #[serde(default, rename = "fairplayCertificateURL")]
    pub fairplay_certificate_url: Option<String>,
    #[serde(default, rename = "playreadyLicenseURL")]
    pub playready_license_url: Option<String>,
}

/// Ad metadata delivered by preplay (VOD) or ping (live)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UplynkAds {
    /// Ad breaks in stream order
    #[serde(default)]
    pub breaks: Vec<UplynkAdBreak>,
    /// Break index/offset pairs for timeline markers
    #[serde(default, rename = "breakOffsets")]
    pub break_offsets: Vec<UplynkBreakOffset>,
    /// Offsets of placeholder slots that were not filled
    #[serde(default, rename = "placeholderOffsets")]
    pub placeholder_offsets: Vec<UplynkPlaceholder>,
}

/// A single server-stitched ad break
#[derive(Debug, Clone, Deserialize)]
pub struct UplynkAdBreak {
    /// Offset from stream start, in seconds
    #[serde(rename = "timeOffset")]
    pub time_offset: f64,
    /// Break duration in seconds; negative on live breaks without a known end
    #[serde(default)]
    pub duration: f64,
    /// Break class, e.g. `"linear"`
    #[serde(default, rename = "type")]
    pub break_type: Option<String>,
    /// Position hint: `"preroll"`, `"midroll"`, or `"postroll"`
    #[serde(default)]
    pub position: Option<String>,
    /// Ads inside the break, in play order
    #[serde(default)]
    pub ads: Vec<UplynkAd>,
    /// Tracking event URLs keyed by event name
    #[serde(default)]
    pub events: HashMap<String, Vec<String>>,
}

/// A single ad inside a break
#[derive(Debug, Clone, Deserialize)]
pub struct UplynkAd {
    /// Ad duration in seconds
    #[serde(default)]
    pub duration: f64,
    /// API framework, e.g. `"VPAID"`; non-linear ads are not scheduled
    #[serde(default, rename = "apiFramework")]
    pub api_framework: Option<String>,
    /// Creative identifier
    #[serde(default)]
    pub creative: Option<String>,
    /// Creative MIME type
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
    /// Creative width; zero when not applicable
    #[serde(default)]
    pub width: u32,
    /// Creative height; zero when not applicable
    #[serde(default)]
    pub height: u32,
    /// Tracking event URLs keyed by event name
    #[serde(default)]
    pub events: HashMap<String, Vec<String>>,
    /// FreeWheel parameters passed through verbatim
    #[serde(default, rename = "fw_parameters")]
    pub fw_parameters: HashMap<String, String>,
}

/// Break index/offset pair
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UplynkBreakOffset {
    pub index: usize,
    #[serde(rename = "timeOffset")]
    pub time_offset: f64,
}

/// Placeholder slot that was not filled with an ad
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UplynkPlaceholder {
    #[serde(rename = "startTime")]
    pub start_time: f64,
    #[serde(rename = "endTime")]
    pub end_time: f64,
    #[serde(rename = "breakIndex")]
    pub break_index: usize,
    #[serde(rename = "adsIndex", default)]
    pub ads_index: usize,
}

/// Response of a session ping
#[derive(Debug, Clone, Deserialize)]
pub struct PingResponse {
    /// Playhead time of the next ping, in seconds; negative stops pinging
    pub next_time: f64,
    /// Newly available ad metadata (live sessions)
    #[serde(default)]
    pub ads: Option<UplynkAds>,
    /// Platform extensions passed through verbatim
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
    /// Platform-side error; pinging continues unless `next_time` says stop
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of an asset-info request
#[derive(Debug, Clone, Deserialize)]
pub struct AssetInfoResponse {
    /// Asset GUID
    pub asset: String,
    /// Asset description
    #[serde(default)]
    pub desc: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: f64,
    /// Poster image URL
    #[serde(default)]
    pub poster_url: Option<String>,
    /// Thumbnail URL prefix
    #[serde(default)]
    pub thumb_prefix: Option<String>,
    /// Content rating flags
    #[serde(default)]
    pub rating_flags: u32,
    /// Whether the asset carries closed captions
    #[serde(default)]
    pub has_captions: bool,
}
