//! Media metadata shown by the platform session

use serde::{Deserialize, Serialize};
use url::Url;

/// What the platform session displays for the current content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Content title
    pub title: Option<String>,
    /// Artist or channel name
    pub artist: Option<String>,
    /// Album or series name
    pub album: Option<String>,
    /// Artwork image URL
    pub artwork: Option<Url>,
    /// Content duration in seconds, when known
    pub duration: Option<f64>,
}

impl MediaMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_artwork(mut self, artwork: Url) -> Self {
        self.artwork = Some(artwork);
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}
