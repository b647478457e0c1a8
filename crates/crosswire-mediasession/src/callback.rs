//! Control routing from the platform session back to the player

/// Transport request arriving from the platform session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaSessionAction {
    Play,
    Pause,
    Stop,
    SeekTo(f64),
    SkipForward(f64),
    SkipBackward(f64),
}

/// Implemented by the host; each method drives the actual player
pub trait MediaSessionCallback: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek_to(&mut self, position: f64);

    /// Default skip handling seeks relative to the given current position
    fn skip(&mut self, from: f64, offset: f64) {
        self.seek_to((from + offset).max(0.0));
    }
}
