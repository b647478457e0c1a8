//! Server-side ad model
//!
//! SSAI connectors own the lifecycle state of every ad break and ad for the
//! duration of a playback session; the host player owns the corresponding
//! records, reached through [`AdController`]. State is discarded and rebuilt
//! whenever new ad-break data arrives from the server.

use crate::error::Error;
use crate::types::{AdBreakId, AdId};
use serde::{Deserialize, Serialize};

/// Lifecycle of an ad break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdBreakState {
    /// The playhead has not reached this break yet
    NotPlayed,
    /// The playhead is (or was) inside this break
    Started,
    /// The break will not produce further notifications
    Finished,
}

impl std::fmt::Display for AdBreakState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdBreakState::NotPlayed => write!(f, "not_played"),
            AdBreakState::Started => write!(f, "started"),
            AdBreakState::Finished => write!(f, "finished"),
        }
    }
}

/// Lifecycle of an individual ad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdState {
    /// The playhead has not reached this ad yet
    NotPlayed,
    /// The ad is playing and reporting progress
    Started,
    /// The ad finished (or was seeked over)
    Completed,
}

impl std::fmt::Display for AdState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdState::NotPlayed => write!(f, "not_played"),
            AdState::Started => write!(f, "started"),
            AdState::Completed => write!(f, "completed"),
        }
    }
}

/// Data for creating or updating an ad-break record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdBreakInit {
    /// Offset from stream start, in seconds
    pub time_offset: f64,
    /// Break duration in seconds; negative means open-ended (live)
    pub duration: f64,
    /// Vendor break type, e.g. `"linear"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_type: Option<String>,
}

impl AdBreakInit {
    pub fn new(time_offset: f64, duration: f64) -> Self {
        Self {
            time_offset,
            duration,
            break_type: None,
        }
    }

    pub fn with_break_type(mut self, break_type: impl Into<String>) -> Self {
        self.break_type = Some(break_type.into());
        self
    }
}

/// Data for creating an ad record inside a break
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdInit {
    /// Ad duration in seconds
    pub duration: f64,
    /// Vendor creative or advert identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_id: Option<String>,
    /// Clickthrough URL, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clickthrough: Option<String>,
}

impl AdInit {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            creative_id: None,
            clickthrough: None,
        }
    }

    pub fn with_creative_id(mut self, creative_id: impl Into<String>) -> Self {
        self.creative_id = Some(creative_id.into());
        self
    }
}

/// The host player's stateful ad-record controller
///
/// Connectors drive record lifecycle through this trait; the host renders ad
/// UI, skip buttons, and timeline markers from the records. Implementations
/// hand out the IDs; connectors must never fabricate them, and calling with
/// an ID this controller did not return is a logic bug.
pub trait AdController: Send {
    /// Create an ad-break record; returns its ID
    fn create_ad_break(&mut self, init: AdBreakInit) -> AdBreakId;

    /// Update an existing ad-break record (e.g. a live break gained a duration)
    fn update_ad_break(&mut self, id: AdBreakId, init: AdBreakInit);

    /// Remove an ad-break record and all ads inside it
    fn remove_ad_break(&mut self, id: AdBreakId);

    /// Create an ad record inside a break; returns its ID
    fn create_ad(&mut self, break_id: AdBreakId, init: AdInit) -> AdId;

    /// The ad became the active ad
    fn begin_ad(&mut self, id: AdId);

    /// Report fractional progress through the active ad, in `[0, 1]`
    fn update_ad_progress(&mut self, id: AdId, progress: f64);

    /// The ad finished playing
    fn end_ad(&mut self, id: AdId);

    /// The ad was skipped or seeked over without completing
    fn skip_ad(&mut self, id: AdId);

    /// A fatal session error; the host decides whether playback continues
    fn error(&mut self, error: &Error);
}
