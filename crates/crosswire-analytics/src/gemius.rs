//! Gemius stream connector
//!
//! Gemius wants basic events stamped with the content offset they occurred
//! at, preceded by a program declaration.

use crate::beacon::Beacon;
use crate::vendor::VendorAdapter;
use async_trait::async_trait;
use crosswire_core::PlayerEvent;
use serde::Serialize;

/// Program declaration
#[derive(Debug, Clone, Default, Serialize)]
pub struct GemiusProgramData {
    pub name: String,
    /// Program duration in seconds; zero for live
    pub duration: f64,
    /// Program classification, e.g. `"video"` or `"audio"`
    pub program_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GemiusEvent {
    NewProgram { program: GemiusProgramData },
    Play { offset: f64 },
    Pause { offset: f64 },
    Seek { offset: f64 },
    Buffer { offset: f64 },
    Complete { offset: f64 },
    Close { offset: f64 },
}

/// Gemius vendor adapter
pub struct GemiusAdapter {
    beacon: Beacon,
    program: GemiusProgramData,
    declared: bool,
    offset: f64,
}

impl GemiusAdapter {
    pub fn new(beacon: Beacon, program: GemiusProgramData) -> Self {
        Self {
            beacon,
            program,
            declared: false,
            offset: 0.0,
        }
    }

    pub fn beacon(&self) -> &Beacon {
        &self.beacon
    }

    async fn declare(&mut self) {
        if !self.declared {
            self.declared = true;
            self.beacon
                .emit(&GemiusEvent::NewProgram {
                    program: self.program.clone(),
                })
                .await;
        }
    }
}

#[async_trait]
impl VendorAdapter for GemiusAdapter {
    fn vendor(&self) -> &'static str {
        "gemius"
    }

    async fn handle_event(&mut self, event: &PlayerEvent) {
        if let Some(position) = event.position() {
            self.offset = position;
        }

        match event {
            PlayerEvent::Playing { position } => {
                self.declare().await;
                self.beacon
                    .emit(&GemiusEvent::Play { offset: *position })
                    .await;
            }
            PlayerEvent::Pause { position } => {
                self.beacon
                    .emit(&GemiusEvent::Pause { offset: *position })
                    .await;
            }
            PlayerEvent::Seeking { to } => {
                self.beacon.emit(&GemiusEvent::Seek { offset: *to }).await;
            }
            PlayerEvent::Waiting { position } => {
                self.beacon
                    .emit(&GemiusEvent::Buffer { offset: *position })
                    .await;
            }
            PlayerEvent::Ended => {
                let offset = self.offset;
                self.beacon.emit(&GemiusEvent::Complete { offset }).await;
                self.beacon.emit(&GemiusEvent::Close { offset }).await;
                self.beacon.flush().await;
            }
            _ => {}
        }
    }

    async fn finish(&mut self) {
        if self.declared {
            let offset = self.offset;
            self.beacon.emit(&GemiusEvent::Close { offset }).await;
            self.beacon.flush().await;
        }
    }
}
