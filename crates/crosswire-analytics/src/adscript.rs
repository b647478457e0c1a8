//! AdScript connector
//!
//! AdScript distinguishes content playback from ad playback: both get
//! metadata plus start/progress/end events, with the ad's own identity while
//! one is active.

use crate::beacon::Beacon;
use crate::vendor::VendorAdapter;
use async_trait::async_trait;
use crosswire_core::PlayerEvent;
use serde::Serialize;
use std::collections::BTreeMap;

/// What kind of material is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdScriptContentType {
    Content,
    Ad,
}

/// Content metadata for the playing asset
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdScriptMetadata {
    /// Asset identifier (`assetid`)
    pub asset_id: String,
    /// Program name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Asset title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Content length in seconds
    pub length: f64,
    /// Free-form i12n attributes
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AdScriptEvent {
    SetMetadata {
        content_type: AdScriptContentType,
        metadata: AdScriptMetadata,
    },
    Start {
        content_type: AdScriptContentType,
    },
    Playing {
        content_type: AdScriptContentType,
        position: f64,
    },
    Pause {
        position: f64,
    },
    End {
        content_type: AdScriptContentType,
    },
}

/// AdScript vendor adapter
pub struct AdScriptAdapter {
    beacon: Beacon,
    metadata: AdScriptMetadata,
    started: bool,
    /// Identity of the ad currently playing, if any
    active_ad: Option<String>,
}

impl AdScriptAdapter {
    pub fn new(beacon: Beacon, metadata: AdScriptMetadata) -> Self {
        Self {
            beacon,
            metadata,
            started: false,
            active_ad: None,
        }
    }

    pub fn beacon(&self) -> &Beacon {
        &self.beacon
    }

    fn current_type(&self) -> AdScriptContentType {
        if self.active_ad.is_some() {
            AdScriptContentType::Ad
        } else {
            AdScriptContentType::Content
        }
    }
}

#[async_trait]
impl VendorAdapter for AdScriptAdapter {
    fn vendor(&self) -> &'static str {
        "adscript"
    }

    async fn handle_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::Playing { position } => {
                if !self.started {
                    self.started = true;
                    self.beacon
                        .emit(&AdScriptEvent::SetMetadata {
                            content_type: AdScriptContentType::Content,
                            metadata: self.metadata.clone(),
                        })
                        .await;
                    self.beacon
                        .emit(&AdScriptEvent::Start {
                            content_type: AdScriptContentType::Content,
                        })
                        .await;
                }
                self.beacon
                    .emit(&AdScriptEvent::Playing {
                        content_type: self.current_type(),
                        position: *position,
                    })
                    .await;
            }
            PlayerEvent::Pause { position } => {
                self.beacon
                    .emit(&AdScriptEvent::Pause {
                        position: *position,
                    })
                    .await;
            }
            PlayerEvent::AdBegin { id, duration } => {
                self.active_ad = Some(id.clone());
                let metadata = AdScriptMetadata {
                    asset_id: id.clone(),
                    length: *duration,
                    ..Default::default()
                };
                self.beacon
                    .emit(&AdScriptEvent::SetMetadata {
                        content_type: AdScriptContentType::Ad,
                        metadata,
                    })
                    .await;
                self.beacon
                    .emit(&AdScriptEvent::Start {
                        content_type: AdScriptContentType::Ad,
                    })
                    .await;
            }
            PlayerEvent::AdEnd { id } => {
                if self.active_ad.as_deref() == Some(id.as_str()) {
                    self.active_ad = None;
                    self.beacon
                        .emit(&AdScriptEvent::End {
                            content_type: AdScriptContentType::Ad,
                        })
                        .await;
                }
            }
            PlayerEvent::Ended => {
                if self.started {
                    self.started = false;
                    self.beacon
                        .emit(&AdScriptEvent::End {
                            content_type: AdScriptContentType::Content,
                        })
                        .await;
                    self.beacon.flush().await;
                }
            }
            _ => {}
        }
    }

    async fn finish(&mut self) {
        if self.started {
            self.started = false;
            self.beacon
                .emit(&AdScriptEvent::End {
                    content_type: AdScriptContentType::Content,
                })
                .await;
            self.beacon.flush().await;
        }
    }
}
