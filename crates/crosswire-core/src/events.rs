//! Player event stream
//!
//! The host player publishes its lifecycle onto a broadcast bus; connectors
//! subscribe and translate. Events are plain data - no handles back into the
//! player - so a lagging subscriber can never block playback.

use crate::types::MetadataFrame;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default broadcast capacity; time updates dominate the stream
const DEFAULT_BUS_CAPACITY: usize = 256;

/// Events published by the host player
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// A new source was set on the player
    SourceChange,

    /// Playback was requested
    Play,

    /// Playback actually progressed
    Playing { position: f64 },

    /// Playback paused
    Pause { position: f64 },

    /// Playhead progressed during normal playback
    TimeUpdate { current_time: f64 },

    /// A seek started
    Seeking { to: f64 },

    /// A seek finished
    Seeked { at: f64 },

    /// Playback stalled waiting for data
    Waiting { position: f64 },

    /// Content duration became known or changed
    DurationChange { duration: f64 },

    /// Playback rate changed
    RateChange { rate: f64 },

    /// Volume changed
    VolumeChange { volume: f64 },

    /// In-band timed metadata reached the playhead
    TimedMetadata { frames: Vec<MetadataFrame> },

    /// An ad break began (published by SSAI integrations)
    AdBreakBegin { offset: f64 },

    /// An ad break ended
    AdBreakEnd { offset: f64 },

    /// An individual ad began
    AdBegin { id: String, duration: f64 },

    /// An individual ad ended
    AdEnd { id: String },

    /// Playback reached the end of the content
    Ended,

    /// A playback error occurred
    Error { code: String, fatal: bool },
}

impl PlayerEvent {
    /// Playhead position carried by this event, if any
    pub fn position(&self) -> Option<f64> {
        match self {
            PlayerEvent::Playing { position }
            | PlayerEvent::Pause { position }
            | PlayerEvent::Waiting { position } => Some(*position),
            PlayerEvent::TimeUpdate { current_time } => Some(*current_time),
            PlayerEvent::Seeking { to } => Some(*to),
            PlayerEvent::Seeked { at } => Some(*at),
            _ => None,
        }
    }
}

/// Broadcast bus carrying [`PlayerEvent`]s from the host player to connectors
#[derive(Debug, Clone)]
pub struct PlayerBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl PlayerBus {
    /// Create a bus with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// Create a bus with an explicit buffer capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers
    ///
    /// Publishing with no live subscribers is not an error; the event is
    /// simply dropped.
    pub fn publish(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PlayerBus {
    fn default() -> Self {
        Self::new()
    }
}
