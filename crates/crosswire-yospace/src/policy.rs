//! Playback policy
//!
//! Answers what the host may let the viewer do while ads are pending. The
//! policy is a pure snapshot: the connector refreshes it whenever the
//! handler's break list changes, and the host consults it before honouring
//! pause/seek/skip requests.

use crate::config::YospaceStreamType;

/// Break view the policy reasons over
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyBreak {
    pub start: f64,
    pub duration: f64,
    /// Finished breaks no longer constrain seeking
    pub finished: bool,
}

impl PolicyBreak {
    fn end(&self) -> f64 {
        self.start + self.duration
    }

    fn contains(&self, time: f64) -> bool {
        if self.duration < 0.0 {
            time >= self.start
        } else {
            time >= self.start && time < self.end()
        }
    }
}

/// Seek/pause/skip rules for a Yospace session
#[derive(Debug, Clone)]
pub struct PlaybackPolicy {
    stream_type: YospaceStreamType,
    breaks: Vec<PolicyBreak>,
}

impl PlaybackPolicy {
    pub fn new(stream_type: YospaceStreamType) -> Self {
        Self {
            stream_type,
            breaks: Vec::new(),
        }
    }

    /// Refresh the break snapshot
    pub fn set_breaks(&mut self, mut breaks: Vec<PolicyBreak>) {
        breaks.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
        self.breaks = breaks;
    }

    /// Pausing is allowed except on plain live streams
    pub fn can_pause(&self) -> bool {
        self.stream_type != YospaceStreamType::Live
    }

    /// Seeking is allowed except on plain live streams
    pub fn can_seek(&self) -> bool {
        self.stream_type != YospaceStreamType::Live
    }

    /// Skipping is never allowed inside an unwatched server-side break
    pub fn can_skip(&self, position: f64) -> bool {
        !self
            .breaks
            .iter()
            .any(|b| !b.finished && b.contains(position))
    }

    /// Clamp a seek target
    ///
    /// A forward seek that would jump into or across an unwatched break is
    /// clamped to that break's start, so the break still plays. Backward
    /// seeks and seeks across finished breaks pass through.
    pub fn clamp_seek(&self, from: f64, to: f64) -> f64 {
        if !self.can_seek() {
            return from;
        }
        if to <= from {
            return to;
        }
        self.breaks
            .iter()
            .filter(|b| !b.finished)
            .filter(|b| b.start > from && b.start <= to)
            .map(|b| b.start)
            .fold(to, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(stream_type: YospaceStreamType, breaks: Vec<PolicyBreak>) -> PlaybackPolicy {
        let mut policy = PlaybackPolicy::new(stream_type);
        policy.set_breaks(breaks);
        policy
    }

    fn unwatched(start: f64, duration: f64) -> PolicyBreak {
        PolicyBreak {
            start,
            duration,
            finished: false,
        }
    }

    #[test]
    fn test_live_cannot_pause_or_seek() {
        let policy = policy(YospaceStreamType::Live, vec![]);
        assert!(!policy.can_pause());
        assert!(!policy.can_seek());
        assert_eq!(policy.clamp_seek(10.0, 50.0), 10.0);
    }

    #[test]
    fn test_vod_forward_seek_clamped_to_break_start() {
        let policy = policy(YospaceStreamType::Vod, vec![unwatched(120.0, 30.0)]);
        assert_eq!(policy.clamp_seek(10.0, 300.0), 120.0);
        assert_eq!(policy.clamp_seek(10.0, 125.0), 120.0);
    }

    #[test]
    fn test_vod_seek_before_break_untouched() {
        let policy = policy(YospaceStreamType::Vod, vec![unwatched(120.0, 30.0)]);
        assert_eq!(policy.clamp_seek(10.0, 60.0), 60.0);
    }

    #[test]
    fn test_watched_break_does_not_clamp() {
        let policy = policy(
            YospaceStreamType::Vod,
            vec![PolicyBreak {
                start: 120.0,
                duration: 30.0,
                finished: true,
            }],
        );
        assert_eq!(policy.clamp_seek(10.0, 300.0), 300.0);
    }

    #[test]
    fn test_backward_seek_passes_through() {
        let policy = policy(YospaceStreamType::Vod, vec![unwatched(120.0, 30.0)]);
        assert_eq!(policy.clamp_seek(300.0, 10.0), 10.0);
    }

    #[test]
    fn test_earliest_break_wins() {
        let policy = policy(
            YospaceStreamType::Vod,
            vec![unwatched(240.0, 30.0), unwatched(120.0, 30.0)],
        );
        assert_eq!(policy.clamp_seek(10.0, 400.0), 120.0);
    }

    #[test]
    fn test_skip_blocked_inside_unwatched_break() {
        let policy = policy(YospaceStreamType::Vod, vec![unwatched(120.0, 30.0)]);
        assert!(!policy.can_skip(125.0));
        assert!(policy.can_skip(60.0));
    }
}
