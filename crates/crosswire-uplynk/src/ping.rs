//! Server-driven ping cadence
//!
//! There is no client-side timer: each ping response tells the session when
//! the next ping is due, as a playhead time. A negative `next_time`
//! permanently stops the loop for the session.

use crate::config::{PingConfiguration, UplynkAssetType};
use crate::model::PingResponse;
use tracing::debug;

/// Ping features effective for a session, after resolving the stream class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingFeatures {
    pub ad_impressions: bool,
    pub freewheel_video_views: bool,
    pub linear_ad_data: bool,
}

impl PingFeatures {
    /// Resolve the configured opt-ins against the asset type
    ///
    /// Ad impressions only apply to VOD; linear ad data only to live.
    pub fn resolve(config: &PingConfiguration, asset_type: UplynkAssetType) -> Self {
        let live = asset_type.is_live();
        Self {
            ad_impressions: config.ad_impressions && !live,
            freewheel_video_views: config.freewheel_video_views,
            linear_ad_data: config.linear_ad_data && live,
        }
    }

    /// Whether any feature is active; no feature means no ping loop at all
    pub fn any(&self) -> bool {
        self.ad_impressions || self.freewheel_video_views || self.linear_ad_data
    }

    /// Bitmask for the `ad.pingf` preplay parameter
    pub fn bitmask(&self) -> u8 {
        let mut mask = 0;
        if self.ad_impressions {
            mask |= 1;
        }
        if self.freewheel_video_views {
            mask |= 2;
        }
        if self.linear_ad_data {
            mask |= 4;
        }
        mask
    }
}

/// Tracks when the next ping is due for a session
#[derive(Debug)]
pub struct PingScheduler {
    features: PingFeatures,
    /// Playhead time of the next ping; `None` once the server said stop
    next_time: Option<f64>,
    /// A request is on the wire; suppress further pings until it resolves
    in_flight: bool,
}

impl PingScheduler {
    /// Create a scheduler; the first ping is due immediately at playback start
    pub fn new(features: PingFeatures) -> Self {
        Self {
            features,
            next_time: features.any().then_some(0.0),
            in_flight: false,
        }
    }

    /// Whether the session pings at all
    pub fn enabled(&self) -> bool {
        self.next_time.is_some() || self.in_flight
    }

    /// Whether seeks must be reported out of band
    pub fn wants_seek_events(&self) -> bool {
        self.features.freewheel_video_views
    }

    /// Whether a ping is due at the given playhead
    pub fn due(&self, playhead: f64) -> bool {
        !self.in_flight && matches!(self.next_time, Some(next) if playhead >= next)
    }

    /// Mark a request as sent
    pub fn begin_request(&mut self) {
        self.in_flight = true;
    }

    /// Apply a ping response; a negative `next_time` stops the loop
    pub fn on_response(&mut self, response: &PingResponse) {
        self.in_flight = false;
        if response.next_time < 0.0 {
            debug!("Ping loop stopped by server");
            self.next_time = None;
        } else {
            self.next_time = Some(response.next_time);
        }
    }

    /// A request failed; keep the previous deadline so the next tick retries
    pub fn on_request_failed(&mut self) {
        self.in_flight = false;
    }
}
