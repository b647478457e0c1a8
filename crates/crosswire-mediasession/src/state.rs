//! Playback state snapshot for the platform session

use std::time::Instant;

/// Transport status shown by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// No content loaded
    #[default]
    None,
    Playing,
    Paused,
    Stopped,
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStatus::None => write!(f, "none"),
            PlaybackStatus::Playing => write!(f, "playing"),
            PlaybackStatus::Paused => write!(f, "paused"),
            PlaybackStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Transport controls the session currently offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Actions(u32);

impl Actions {
    pub const PLAY: Actions = Actions(1 << 0);
    pub const PAUSE: Actions = Actions(1 << 1);
    pub const STOP: Actions = Actions(1 << 2);
    pub const SEEK: Actions = Actions(1 << 3);
    pub const SKIP_FORWARD: Actions = Actions(1 << 4);
    pub const SKIP_BACKWARD: Actions = Actions(1 << 5);

    pub const fn empty() -> Self {
        Actions(0)
    }

    pub const fn with(self, other: Actions) -> Self {
        Actions(self.0 | other.0)
    }

    pub const fn without(self, other: Actions) -> Self {
        Actions(self.0 & !other.0)
    }

    pub const fn contains(self, other: Actions) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Position/rate/status snapshot, stamped with when it was taken
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    /// Position at `updated_at`, in seconds
    pub position: f64,
    /// Playback rate; 1.0 is normal speed
    pub rate: f64,
    /// Available transport controls
    pub actions: Actions,
    /// When this snapshot was taken
    pub updated_at: Instant,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            status: PlaybackStatus::None,
            position: 0.0,
            rate: 1.0,
            actions: Actions::empty(),
            updated_at: Instant::now(),
        }
    }

    /// Position projected to now, so the platform scrubber keeps moving
    /// between snapshots
    pub fn projected_position(&self) -> f64 {
        match self.status {
            PlaybackStatus::Playing => {
                self.position + self.updated_at.elapsed().as_secs_f64() * self.rate
            }
            _ => self.position,
        }
    }

    /// Copy of this state with a new position, stamped now
    pub fn at_position(&self, position: f64) -> Self {
        Self {
            position,
            updated_at: Instant::now(),
            ..*self
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}
