//! Core types shared by the Crosswire connectors

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for an ad-break record held by the host player.
///
/// Handed out by the [`AdController`](crate::AdController); connectors never
/// fabricate these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdBreakId(pub u64);

impl std::fmt::Display for AdBreakId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "break#{}", self.0)
    }
}

/// Identifier for an ad record held by the host player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdId(pub u64);

impl std::fmt::Display for AdId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ad#{}", self.0)
    }
}

/// A single in-band timed-metadata frame surfaced by the player.
///
/// Frames are ID3-shaped: a four-character frame ID and a textual payload,
/// stamped with the stream time they apply to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataFrame {
    /// Frame identifier, e.g. `YMID` or `PRIV`
    pub id: String,
    /// Frame payload
    pub value: String,
    /// Stream time the frame applies to, in seconds
    pub start_time: f64,
}

impl MetadataFrame {
    pub fn new(id: impl Into<String>, value: impl Into<String>, start_time: f64) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            start_time,
        }
    }
}
