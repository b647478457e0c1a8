//! Nielsen DCR connector
//!
//! Forwards content metadata and play/stop lifecycle, plus the ID3
//! watermark frames Nielsen's collection relies on. Watermark frames are
//! recognised by their `www.nielsen.com` payload prefix and passed through
//! untouched.

use crate::beacon::Beacon;
use crate::vendor::VendorAdapter;
use async_trait::async_trait;
use crosswire_core::PlayerEvent;
use serde::Serialize;

/// Payload marker of a Nielsen audio watermark carried in ID3
const WATERMARK_MARKER: &str = "www.nielsen.com";

/// DCR content metadata
#[derive(Debug, Clone, Default, Serialize)]
pub struct NielsenMetadata {
    /// Channel or station name
    pub channel_name: String,
    /// Program name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Episode or asset title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Content length in seconds; zero for live
    pub length: f64,
    /// Original air date, `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NielsenEvent {
    LoadMetadata { metadata: NielsenMetadata },
    Play { channel_name: String },
    Stop,
    End,
    SendId3 { payload: String },
}

/// Nielsen vendor adapter
pub struct NielsenAdapter {
    beacon: Beacon,
    metadata: NielsenMetadata,
    playing: bool,
    loaded: bool,
}

impl NielsenAdapter {
    pub fn new(beacon: Beacon, metadata: NielsenMetadata) -> Self {
        Self {
            beacon,
            metadata,
            playing: false,
            loaded: false,
        }
    }

    pub fn beacon(&self) -> &Beacon {
        &self.beacon
    }
}

#[async_trait]
impl VendorAdapter for NielsenAdapter {
    fn vendor(&self) -> &'static str {
        "nielsen"
    }

    async fn handle_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::Playing { .. } => {
                if !self.loaded {
                    self.loaded = true;
                    self.beacon
                        .emit(&NielsenEvent::LoadMetadata {
                            metadata: self.metadata.clone(),
                        })
                        .await;
                }
                if !self.playing {
                    self.playing = true;
                    self.beacon
                        .emit(&NielsenEvent::Play {
                            channel_name: self.metadata.channel_name.clone(),
                        })
                        .await;
                }
            }
            PlayerEvent::Pause { .. } | PlayerEvent::Waiting { .. } => {
                if self.playing {
                    self.playing = false;
                    self.beacon.emit(&NielsenEvent::Stop).await;
                }
            }
            PlayerEvent::TimedMetadata { frames } => {
                for frame in frames {
                    if frame.value.contains(WATERMARK_MARKER) {
                        self.beacon
                            .emit(&NielsenEvent::SendId3 {
                                payload: frame.value.clone(),
                            })
                            .await;
                    }
                }
            }
            PlayerEvent::Ended => {
                self.playing = false;
                self.beacon.emit(&NielsenEvent::End).await;
                self.beacon.flush().await;
            }
            _ => {}
        }
    }

    async fn finish(&mut self) {
        if self.playing {
            self.playing = false;
            self.beacon.emit(&NielsenEvent::Stop).await;
        }
        self.beacon.flush().await;
    }
}
