//! Conviva connector
//!
//! Maps the player lifecycle onto Conviva's session model: a session starts
//! on the first play intent and ends on content end, stop, or a fatal error.
//! Playback state is reported on every transition, deduplicated so Conviva
//! never sees the same state twice in a row.

use crate::beacon::Beacon;
use crate::vendor::VendorAdapter;
use async_trait::async_trait;
use crosswire_core::PlayerEvent;
use serde::Serialize;
use std::collections::BTreeMap;

/// Content metadata attached to the Conviva session
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvivaMetadata {
    /// Asset name, the primary Conviva dimension
    pub asset_name: String,
    /// Viewer identity, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_id: Option<String>,
    /// Player name reported to Conviva
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    /// Live or VOD
    pub is_live: bool,
    /// Content length in seconds, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Custom dimension tags
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,
}

impl ConvivaMetadata {
    pub fn new(asset_name: impl Into<String>) -> Self {
        Self {
            asset_name: asset_name.into(),
            ..Default::default()
        }
    }

    pub fn with_viewer_id(mut self, viewer_id: impl Into<String>) -> Self {
        self.viewer_id = Some(viewer_id.into());
        self
    }

    pub fn with_player_name(mut self, player_name: impl Into<String>) -> Self {
        self.player_name = Some(player_name.into());
        self
    }

    pub fn with_live(mut self, is_live: bool) -> Self {
        self.is_live = is_live;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}

/// Conviva playback states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvivaPlaybackState {
    Stopped,
    Playing,
    Paused,
    Buffering,
}

/// Reports sent to Conviva
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConvivaEvent {
    SessionStart { metadata: ConvivaMetadata },
    PlaybackState { state: ConvivaPlaybackState },
    DurationChange { duration: f64 },
    SeekStart { to: f64 },
    SeekEnd { at: f64 },
    AdBreakStart { offset: f64 },
    AdBreakEnd { offset: f64 },
    PlaybackError { code: String, fatal: bool },
    SessionEnd,
}

/// Conviva vendor adapter
pub struct ConvivaAdapter {
    beacon: Beacon,
    metadata: ConvivaMetadata,
    session_active: bool,
    state: ConvivaPlaybackState,
}

impl ConvivaAdapter {
    pub fn new(beacon: Beacon, metadata: ConvivaMetadata) -> Self {
        Self {
            beacon,
            metadata,
            session_active: false,
            state: ConvivaPlaybackState::Stopped,
        }
    }

    /// Access the beacon, mainly for tests
    pub fn beacon(&self) -> &Beacon {
        &self.beacon
    }

    async fn ensure_session(&mut self) {
        if !self.session_active {
            self.session_active = true;
            self.beacon
                .emit(&ConvivaEvent::SessionStart {
                    metadata: self.metadata.clone(),
                })
                .await;
        }
    }

    async fn set_state(&mut self, state: ConvivaPlaybackState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.beacon.emit(&ConvivaEvent::PlaybackState { state }).await;
    }

    async fn end_session(&mut self) {
        if self.session_active {
            self.set_state(ConvivaPlaybackState::Stopped).await;
            self.beacon.emit(&ConvivaEvent::SessionEnd).await;
            self.beacon.flush().await;
            self.session_active = false;
        }
    }
}

#[async_trait]
impl VendorAdapter for ConvivaAdapter {
    fn vendor(&self) -> &'static str {
        "conviva"
    }

    async fn handle_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::Play | PlayerEvent::Playing { .. } => {
                self.ensure_session().await;
                self.set_state(ConvivaPlaybackState::Playing).await;
            }
            PlayerEvent::Pause { .. } => {
                self.set_state(ConvivaPlaybackState::Paused).await;
            }
            PlayerEvent::Waiting { .. } => {
                if self.session_active {
                    self.set_state(ConvivaPlaybackState::Buffering).await;
                }
            }
            PlayerEvent::DurationChange { duration } => {
                self.metadata.duration = Some(*duration);
                if self.session_active {
                    self.beacon
                        .emit(&ConvivaEvent::DurationChange {
                            duration: *duration,
                        })
                        .await;
                }
            }
            PlayerEvent::Seeking { to } => {
                if self.session_active {
                    self.beacon.emit(&ConvivaEvent::SeekStart { to: *to }).await;
                }
            }
            PlayerEvent::Seeked { at } => {
                if self.session_active {
                    self.beacon.emit(&ConvivaEvent::SeekEnd { at: *at }).await;
                }
            }
            PlayerEvent::AdBreakBegin { offset } => {
                self.beacon
                    .emit(&ConvivaEvent::AdBreakStart { offset: *offset })
                    .await;
            }
            PlayerEvent::AdBreakEnd { offset } => {
                self.beacon
                    .emit(&ConvivaEvent::AdBreakEnd { offset: *offset })
                    .await;
            }
            PlayerEvent::Error { code, fatal } => {
                self.beacon
                    .emit(&ConvivaEvent::PlaybackError {
                        code: code.clone(),
                        fatal: *fatal,
                    })
                    .await;
                if *fatal {
                    self.end_session().await;
                }
            }
            PlayerEvent::Ended => {
                self.end_session().await;
            }
            PlayerEvent::SourceChange => {
                // A new source means a new Conviva session
                self.end_session().await;
            }
            _ => {}
        }
    }

    async fn finish(&mut self) {
        self.end_session().await;
    }
}
