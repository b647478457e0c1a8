//! Media-session connector
//!
//! Keeps a [`PlaybackState`] + [`MediaMetadata`] snapshot in sync with the
//! player bus and routes platform control requests to the host callback.
//! Snapshots travel over a watch channel so the platform side always sees
//! the latest state without queueing.

use crate::callback::{MediaSessionAction, MediaSessionCallback};
use crate::metadata::MediaMetadata;
use crate::state::{Actions, PlaybackState, PlaybackStatus};
use async_trait::async_trait;
use crosswire_core::{Connector, PlayerBus, PlayerEvent};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Session snapshot published to the platform side
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub metadata: MediaMetadata,
    pub playback: PlaybackState,
}

impl SessionSnapshot {
    fn new(metadata: MediaMetadata) -> Self {
        Self {
            metadata,
            playback: PlaybackState::new(),
        }
    }
}

/// Bridges the player bus and the platform media session
pub struct MediaSessionConnector {
    snapshot_tx: watch::Sender<SessionSnapshot>,
    callback: Box<dyn MediaSessionCallback>,
    worker: Option<JoinHandle<()>>,
}

impl MediaSessionConnector {
    /// Create the connector and start following the bus
    pub fn new(
        metadata: MediaMetadata,
        callback: Box<dyn MediaSessionCallback>,
        bus: &PlayerBus,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::new(metadata));
        let events = bus.subscribe();
        let worker = tokio::spawn(follow_bus(snapshot_tx.clone(), events));
        Self {
            snapshot_tx,
            callback,
            worker: Some(worker),
        }
    }

    /// Subscribe to session snapshots
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Replace the displayed metadata (e.g. program change on a live channel)
    pub fn set_metadata(&self, metadata: MediaMetadata) {
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.metadata = metadata;
        });
    }

    /// Handle a transport request from the platform
    pub fn handle(&mut self, action: MediaSessionAction) {
        debug!(?action, "Media-session action");
        match action {
            MediaSessionAction::Play => self.callback.play(),
            MediaSessionAction::Pause => self.callback.pause(),
            MediaSessionAction::Stop => self.callback.stop(),
            MediaSessionAction::SeekTo(position) => self.callback.seek_to(position),
            MediaSessionAction::SkipForward(offset) => {
                let from = self.snapshot_tx.borrow().playback.projected_position();
                self.callback.skip(from, offset);
            }
            MediaSessionAction::SkipBackward(offset) => {
                let from = self.snapshot_tx.borrow().playback.projected_position();
                self.callback.skip(from, -offset);
            }
        }
    }
}

#[async_trait]
impl Connector for MediaSessionConnector {
    fn name(&self) -> &'static str {
        "mediasession"
    }

    async fn detach(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

impl Drop for MediaSessionConnector {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

/// Actions offered while playing vs. paused
fn actions_for(status: PlaybackStatus) -> Actions {
    let base = Actions::empty()
        .with(Actions::STOP)
        .with(Actions::SEEK)
        .with(Actions::SKIP_FORWARD)
        .with(Actions::SKIP_BACKWARD);
    match status {
        PlaybackStatus::Playing => base.with(Actions::PAUSE),
        PlaybackStatus::Paused | PlaybackStatus::Stopped => base.with(Actions::PLAY),
        PlaybackStatus::None => Actions::empty(),
    }
}

async fn follow_bus(
    snapshot_tx: watch::Sender<SessionSnapshot>,
    mut events: broadcast::Receiver<PlayerEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                snapshot_tx.send_modify(|snapshot| apply_event(snapshot, &event));
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Player bus closed; media session frozen");
                break;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Media session lagged behind the bus");
            }
        }
    }
}

fn apply_event(snapshot: &mut SessionSnapshot, event: &PlayerEvent) {
    match event {
        PlayerEvent::Playing { position } => {
            snapshot.playback = snapshot.playback.at_position(*position);
            snapshot.playback.status = PlaybackStatus::Playing;
        }
        PlayerEvent::Pause { position } => {
            snapshot.playback = snapshot.playback.at_position(*position);
            snapshot.playback.status = PlaybackStatus::Paused;
        }
        PlayerEvent::TimeUpdate { current_time } => {
            snapshot.playback = snapshot.playback.at_position(*current_time);
        }
        PlayerEvent::Seeked { at } => {
            snapshot.playback = snapshot.playback.at_position(*at);
        }
        PlayerEvent::RateChange { rate } => {
            snapshot.playback.rate = *rate;
        }
        PlayerEvent::DurationChange { duration } => {
            snapshot.metadata.duration = Some(*duration);
        }
        PlayerEvent::Ended => {
            snapshot.playback.status = PlaybackStatus::Stopped;
        }
        PlayerEvent::SourceChange => {
            snapshot.playback = PlaybackState::new();
        }
        _ => {}
    }
    snapshot.playback.actions = actions_for(snapshot.playback.status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingCallback {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl MediaSessionCallback for RecordingCallback {
        fn play(&mut self) {
            self.calls.lock().unwrap().push("play".into());
        }
        fn pause(&mut self) {
            self.calls.lock().unwrap().push("pause".into());
        }
        fn stop(&mut self) {
            self.calls.lock().unwrap().push("stop".into());
        }
        fn seek_to(&mut self, position: f64) {
            self.calls.lock().unwrap().push(format!("seek:{position}"));
        }
    }

    #[tokio::test]
    async fn test_snapshot_follows_events() {
        let bus = PlayerBus::new();
        let connector = MediaSessionConnector::new(
            MediaMetadata::new().with_title("Documentary"),
            Box::new(RecordingCallback::default()),
            &bus,
        );

        bus.publish(PlayerEvent::Playing { position: 10.0 });
        bus.publish(PlayerEvent::DurationChange { duration: 3600.0 });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snapshot = connector.snapshot();
        assert_eq!(snapshot.playback.status, PlaybackStatus::Playing);
        assert_eq!(snapshot.metadata.duration, Some(3600.0));
        assert!(snapshot.playback.actions.contains(Actions::PAUSE));
        assert!(!snapshot.playback.actions.contains(Actions::PLAY));
    }

    #[tokio::test]
    async fn test_pause_flips_offered_actions() {
        let bus = PlayerBus::new();
        let connector = MediaSessionConnector::new(
            MediaMetadata::new(),
            Box::new(RecordingCallback::default()),
            &bus,
        );

        bus.publish(PlayerEvent::Playing { position: 0.0 });
        bus.publish(PlayerEvent::Pause { position: 5.0 });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snapshot = connector.snapshot();
        assert_eq!(snapshot.playback.status, PlaybackStatus::Paused);
        assert!(snapshot.playback.actions.contains(Actions::PLAY));
        assert_eq!(snapshot.playback.position, 5.0);
    }

    #[tokio::test]
    async fn test_actions_route_to_callback() {
        let bus = PlayerBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut connector = MediaSessionConnector::new(
            MediaMetadata::new(),
            Box::new(RecordingCallback { calls: calls.clone() }),
            &bus,
        );

        connector.handle(MediaSessionAction::Play);
        connector.handle(MediaSessionAction::SeekTo(90.0));
        connector.handle(MediaSessionAction::Pause);

        assert_eq!(
            calls.lock().unwrap().clone(),
            vec!["play", "seek:90", "pause"]
        );
    }

    #[tokio::test]
    async fn test_skip_uses_projected_position() {
        let bus = PlayerBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut connector = MediaSessionConnector::new(
            MediaMetadata::new(),
            Box::new(RecordingCallback { calls: calls.clone() }),
            &bus,
        );

        bus.publish(PlayerEvent::Pause { position: 100.0 });
        tokio::time::sleep(Duration::from_millis(20)).await;

        connector.handle(MediaSessionAction::SkipBackward(30.0));
        assert_eq!(calls.lock().unwrap().clone(), vec!["seek:70"]);
    }
}
