//! Crosswire MediaSession - platform media-controls integration
//!
//! The interface contract between the player and the platform's media
//! session: what is playing ([`MediaMetadata`]), where playback stands
//! ([`PlaybackState`]), which transport controls apply ([`Actions`]), and
//! how control requests route back to the player
//! ([`MediaSessionCallback`]). Platform plumbing itself stays with the host.

pub mod callback;
pub mod connector;
pub mod metadata;
pub mod state;

pub use callback::{MediaSessionAction, MediaSessionCallback};
pub use connector::{MediaSessionConnector, SessionSnapshot};
pub use metadata::MediaMetadata;
pub use state::{Actions, PlaybackState, PlaybackStatus};
