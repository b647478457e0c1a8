//! Comscore connector
//!
//! Comscore streaming tags are a strict notify state machine: each notify
//! call is only valid from certain states, and buffering during a pause must
//! not be reported. The adapter enforces the transitions locally so the
//! vendor only ever receives a legal sequence.

use crate::beacon::Beacon;
use crate::vendor::VendorAdapter;
use async_trait::async_trait;
use crosswire_core::PlayerEvent;
use serde::Serialize;

/// Streaming-tag metadata for the current asset
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComscoreMetadata {
    /// Publisher ID (the `c2` dimension)
    pub publisher_id: String,
    /// Unique asset ID
    pub asset_id: String,
    /// Program title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_title: Option<String>,
    /// Episode title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_title: Option<String>,
    /// Content length in seconds; zero for live
    pub length: f64,
    /// Live or VOD classification
    pub live: bool,
}

/// Local streaming state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingState {
    Idle,
    Playing,
    Paused,
    Buffering,
    Seeking,
}

/// Notify calls sent to Comscore
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "notify", rename_all = "snake_case")]
pub enum ComscoreEvent {
    CreatePlaybackSession { metadata: ComscoreMetadata },
    Play { position: f64 },
    Pause { position: f64 },
    BufferStart { position: f64 },
    BufferStop { position: f64 },
    SeekStart { position: f64 },
    ChangePlaybackRate { rate: f64 },
    End { position: f64 },
}

/// Comscore vendor adapter
pub struct ComscoreAdapter {
    beacon: Beacon,
    metadata: ComscoreMetadata,
    state: StreamingState,
    session_created: bool,
    position: f64,
}

impl ComscoreAdapter {
    pub fn new(beacon: Beacon, metadata: ComscoreMetadata) -> Self {
        Self {
            beacon,
            metadata,
            state: StreamingState::Idle,
            session_created: false,
            position: 0.0,
        }
    }

    pub fn beacon(&self) -> &Beacon {
        &self.beacon
    }

    /// Current state, exposed for the host's diagnostics
    pub fn state(&self) -> StreamingState {
        self.state
    }

    async fn notify_play(&mut self, position: f64) {
        if !self.session_created {
            self.session_created = true;
            self.beacon
                .emit(&ComscoreEvent::CreatePlaybackSession {
                    metadata: self.metadata.clone(),
                })
                .await;
        }
        // Leaving a buffer interval must close it first
        if self.state == StreamingState::Buffering {
            self.beacon
                .emit(&ComscoreEvent::BufferStop { position })
                .await;
        }
        if self.state != StreamingState::Playing {
            self.state = StreamingState::Playing;
            self.beacon.emit(&ComscoreEvent::Play { position }).await;
        }
    }
}

#[async_trait]
impl VendorAdapter for ComscoreAdapter {
    fn vendor(&self) -> &'static str {
        "comscore"
    }

    async fn handle_event(&mut self, event: &PlayerEvent) {
        if let Some(position) = event.position() {
            self.position = position;
        }

        match event {
            PlayerEvent::Playing { position } => {
                self.notify_play(*position).await;
            }
            PlayerEvent::Pause { position } => {
                if self.state == StreamingState::Playing || self.state == StreamingState::Buffering
                {
                    self.state = StreamingState::Paused;
                    self.beacon
                        .emit(&ComscoreEvent::Pause {
                            position: *position,
                        })
                        .await;
                }
            }
            PlayerEvent::Waiting { position } => {
                // The pause-on-buffering rule: a stall while paused is
                // invisible to Comscore
                if self.state == StreamingState::Playing {
                    self.state = StreamingState::Buffering;
                    self.beacon
                        .emit(&ComscoreEvent::BufferStart {
                            position: *position,
                        })
                        .await;
                }
            }
            PlayerEvent::Seeking { to } => {
                if self.state == StreamingState::Playing || self.state == StreamingState::Paused {
                    self.state = StreamingState::Seeking;
                    self.beacon
                        .emit(&ComscoreEvent::SeekStart { position: *to })
                        .await;
                }
            }
            PlayerEvent::RateChange { rate } => {
                if self.session_created {
                    self.beacon
                        .emit(&ComscoreEvent::ChangePlaybackRate { rate: *rate })
                        .await;
                }
            }
            PlayerEvent::Ended => {
                if self.session_created && self.state != StreamingState::Idle {
                    self.state = StreamingState::Idle;
                    self.beacon
                        .emit(&ComscoreEvent::End {
                            position: self.position,
                        })
                        .await;
                    self.beacon.flush().await;
                }
            }
            _ => {}
        }
    }

    async fn finish(&mut self) {
        if self.session_created && self.state != StreamingState::Idle {
            self.state = StreamingState::Idle;
            let position = self.position;
            self.beacon.emit(&ComscoreEvent::End { position }).await;
            self.beacon.flush().await;
        }
    }
}
