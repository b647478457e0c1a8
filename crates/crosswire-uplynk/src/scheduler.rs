//! Ad-break scheduling
//!
//! [`UplynkAdScheduler`] reconciles server-delivered ad-break metadata
//! against the player playhead, mapping continuous time progression onto
//! discrete lifecycle transitions and mirroring them into the host's
//! [`AdController`] records.
//!
//! The scheduler exclusively owns lifecycle state for the session. Ad-break
//! intervals are half-open `[start, start + duration)`; a break with
//! negative duration is open-ended (live) and matches any time at or after
//! its start.

use crate::model::UplynkAds;
use crosswire_core::{AdBreakId, AdBreakInit, AdBreakState, AdController, AdId, AdInit, AdState};
use tracing::{debug, warn};

/// Scheduler-owned state for one ad break
#[derive(Debug)]
struct AdBreakHandle {
    /// Controller record; created the first time the break starts
    remote: Option<AdBreakId>,
    start: f64,
    duration: f64,
    break_type: Option<String>,
    state: AdBreakState,
    ads: Vec<AdHandle>,
}

/// Scheduler-owned state for one ad
#[derive(Debug)]
struct AdHandle {
    remote: Option<AdId>,
    /// Absolute start time within the stream
    start: f64,
    duration: f64,
    creative: Option<String>,
    state: AdState,
}

impl AdBreakHandle {
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

    /// Controller record ID; the record must exist by the time this is asked
    fn remote(&self) -> AdBreakId {
        match self.remote {
            Some(id) => id,
            None => panic!(
                "ad break at {}s has no controller record; scheduler out of sync",
                self.start
            ),
        }
    }
}

impl AdHandle {
    fn end(&self) -> f64 {
        self.start + self.duration
    }

    fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }

    fn remote(&self) -> AdId {
        match self.remote {
            Some(id) => id,
            None => panic!(
                "ad at {}s has no controller record; scheduler out of sync",
                self.start
            ),
        }
    }
}

/// Reconciles the playhead against the known ad breaks
pub struct UplynkAdScheduler {
    breaks: Vec<AdBreakHandle>,
    controller: Box<dyn AdController>,
}

impl UplynkAdScheduler {
    /// Create an empty scheduler around the host's controller
    pub fn new(controller: Box<dyn AdController>) -> Self {
        Self {
            breaks: Vec::new(),
            controller,
        }
    }

    /// Number of ad breaks currently tracked
    pub fn break_count(&self) -> usize {
        self.breaks.len()
    }

    /// Replace the tracked breaks with a full server snapshot (preplay)
    ///
    /// Existing controller records are reused for breaks that survive at the
    /// same offset; breaks absent from the snapshot lose their records.
    pub fn replace(&mut self, ads: &UplynkAds) {
        let mut old = std::mem::take(&mut self.breaks);

        for brk in &ads.breaks {
            let reused = old
                .iter()
                .position(|h| h.start == brk.time_offset)
                .map(|i| old.swap_remove(i));

            match reused {
                Some(handle) if handle.ads.len() == brk.ads.len() => {
                    // Same shape: keep record IDs and lifecycle, refresh timing
                    let mut handle = handle;
                    handle.duration = brk.duration;
                    let mut cursor = handle.start;
                    for (ad, incoming) in handle.ads.iter_mut().zip(&brk.ads) {
                        ad.start = cursor;
                        ad.duration = incoming.duration;
                        cursor += incoming.duration;
                    }
                    if let Some(id) = handle.remote {
                        self.controller.update_ad_break(
                            id,
                            break_init(handle.start, handle.duration, &handle.break_type),
                        );
                    }
                    self.breaks.push(handle);
                }
                Some(handle) => {
                    // Shape changed: drop the record and rebuild from scratch
                    if let Some(id) = handle.remote {
                        self.controller.remove_ad_break(id);
                    }
                    self.breaks.push(new_handle(brk));
                }
                None => self.breaks.push(new_handle(brk)),
            }
        }

        for stale in old {
            if let Some(id) = stale.remote {
                debug!(offset = stale.start, "Removing ad break absent from snapshot");
                self.controller.remove_ad_break(id);
            }
        }

        self.breaks
            .sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Merge incrementally delivered breaks (ping), deduplicating by offset
    pub fn merge(&mut self, ads: &UplynkAds) {
        for brk in &ads.breaks {
            if let Some(known) = self.breaks.iter_mut().find(|h| h.start == brk.time_offset) {
                // A live break may gain its real duration after the fact
                if known.duration != brk.duration {
                    known.duration = brk.duration;
                    if let Some(id) = known.remote {
                        self.controller.update_ad_break(
                            id,
                            break_init(known.start, known.duration, &known.break_type),
                        );
                    }
                }
                continue;
            }
            debug!(offset = brk.time_offset, ads = brk.ads.len(), "New ad break from ping");
            self.breaks.push(new_handle(brk));
        }

        self.breaks
            .sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Reconcile against the current playhead
    pub fn on_time_update(&mut self, time: f64) {
        let active = (0..self.breaks.len()).find(|&i| self.breaks[i].contains(time));
        if let Some(index) = active {
            self.advance_active_break(index, time);
        }
        self.retire_inactive_breaks(active);
    }

    /// Finish everything still in flight (end of content, detach)
    pub fn finish_all(&mut self) {
        self.retire_inactive_breaks(None);
    }

    /// Drive the active break: start it if needed, then place the playhead
    /// on the ad it falls into
    fn advance_active_break(&mut self, index: usize, time: f64) {
        if self.breaks[index].state != AdBreakState::Started {
            self.start_break(index);
        }

        let current = self.breaks[index].ads.iter().position(|a| a.contains(time));

        // Ads the playhead has passed are done, whether they ever began
        let passed_end = match current {
            Some(ad_index) => self.breaks[index].ads[ad_index].start,
            None => time,
        };
        self.complete_passed_ads(index, passed_end);

        if let Some(ad_index) = current {
            self.advance_current_ad(index, ad_index, time);
        }
    }

    /// Transition a break to started, creating its records on first sight
    fn start_break(&mut self, index: usize) {
        let brk = &mut self.breaks[index];

        if brk.remote.is_none() {
            let id = self
                .controller
                .create_ad_break(break_init(brk.start, brk.duration, &brk.break_type));
            brk.remote = Some(id);
            for ad in &mut brk.ads {
                let mut init = AdInit::new(ad.duration);
                if let Some(creative) = &ad.creative {
                    init = init.with_creative_id(creative.clone());
                }
                ad.remote = Some(self.controller.create_ad(id, init));
            }
        }

        debug!(offset = brk.start, from = %brk.state, "Ad break started");
        brk.state = AdBreakState::Started;
    }

    /// Complete every ad in the active break that ends at or before `until`
    fn complete_passed_ads(&mut self, index: usize, until: f64) {
        let brk = &mut self.breaks[index];
        for ad in &mut brk.ads {
            let passed = if ad.duration > 0.0 {
                ad.end() <= until
            } else {
                ad.start <= until
            };
            if !passed {
                continue;
            }
            match ad.state {
                AdState::Completed => {}
                AdState::Started => {
                    self.controller.end_ad(ad.remote());
                    ad.state = AdState::Completed;
                }
                AdState::NotPlayed => {
                    // Seeked over without ever becoming current
                    self.controller.skip_ad(ad.remote());
                    ad.state = AdState::Completed;
                }
            }
        }
    }

    /// Begin or progress the ad the playhead sits in
    fn advance_current_ad(&mut self, index: usize, ad_index: usize, time: f64) {
        let ad = &mut self.breaks[index].ads[ad_index];
        match ad.state {
            AdState::NotPlayed | AdState::Completed => {
                debug!(start = ad.start, from = %ad.state, "Ad started");
                self.controller.begin_ad(ad.remote());
                ad.state = AdState::Started;
            }
            AdState::Started => {
                if ad.duration > 0.0 {
                    let progress = ((time - ad.start) / ad.duration).clamp(0.0, 1.0);
                    self.controller.update_ad_progress(ad.remote(), progress);
                }
            }
        }
    }

    /// Finish every started break other than the active one
    ///
    /// Handles both the playhead leaving a break normally and seeking away
    /// from one: remaining started ads are ended, and the break is closed.
    fn retire_inactive_breaks(&mut self, active: Option<usize>) {
        for index in 0..self.breaks.len() {
            if Some(index) == active {
                continue;
            }
            if self.breaks[index].state != AdBreakState::Started {
                continue;
            }

            let brk = &mut self.breaks[index];
            for ad in &mut brk.ads {
                if ad.state == AdState::Started {
                    self.controller.end_ad(ad.remote());
                    ad.state = AdState::Completed;
                }
            }
            debug!(offset = brk.start, "Ad break finished");
            brk.state = AdBreakState::Finished;
        }
    }

    /// Lifecycle snapshot for introspection and tests
    pub fn snapshot(&self) -> Vec<(f64, AdBreakState)> {
        self.breaks.iter().map(|b| (b.start, b.state)).collect()
    }
}

impl std::fmt::Debug for UplynkAdScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UplynkAdScheduler")
            .field("breaks", &self.breaks)
            .finish_non_exhaustive()
    }
}

fn new_handle(brk: &crate::model::UplynkAdBreak) -> AdBreakHandle {
    if brk.duration < 0.0 {
        warn!(offset = brk.time_offset, "Open-ended ad break; awaiting duration from ping");
    }
    let mut ads = Vec::with_capacity(brk.ads.len());
    let mut cursor = brk.time_offset;
    for ad in &brk.ads {
        ads.push(AdHandle {
            remote: None,
            start: cursor,
            duration: ad.duration,
            creative: ad.creative.clone(),
            state: AdState::NotPlayed,
        });
        cursor += ad.duration;
    }
    AdBreakHandle {
        remote: None,
        start: brk.time_offset,
        duration: brk.duration,
        break_type: brk.break_type.clone(),
        state: AdBreakState::NotPlayed,
        ads,
    }
}

fn break_init(start: f64, duration: f64, break_type: &Option<String>) -> AdBreakInit {
    let mut init = AdBreakInit::new(start, duration);
    if let Some(break_type) = break_type {
        init = init.with_break_type(break_type.clone());
    }
    init
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{UplynkAd, UplynkAdBreak};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Records every controller call for assertions
    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CreateBreak(f64, f64),
        UpdateBreak(u64, f64),
        RemoveBreak(u64),
        CreateAd(u64, f64),
        BeginAd(u64),
        Progress(u64, f64),
        EndAd(u64),
        SkipAd(u64),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<Call>>>,
        next_id: u64,
    }

    impl Recorder {
        fn new() -> (Box<dyn AdController>, Arc<Mutex<Vec<Call>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let controller = Recorder {
                calls: calls.clone(),
                next_id: 0,
            };
            (Box::new(controller), calls)
        }
    }

    impl AdController for Recorder {
        fn create_ad_break(&mut self, init: AdBreakInit) -> AdBreakId {
            self.next_id += 1;
            self.calls
                .lock()
                .unwrap()
                .push(Call::CreateBreak(init.time_offset, init.duration));
            AdBreakId(self.next_id)
        }

        fn update_ad_break(&mut self, id: AdBreakId, init: AdBreakInit) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::UpdateBreak(id.0, init.duration));
        }

        fn remove_ad_break(&mut self, id: AdBreakId) {
            self.calls.lock().unwrap().push(Call::RemoveBreak(id.0));
        }

        fn create_ad(&mut self, _break_id: AdBreakId, init: AdInit) -> AdId {
            self.next_id += 1;
            self.calls
                .lock()
                .unwrap()
                .push(Call::CreateAd(self.next_id, init.duration));
            AdId(self.next_id)
        }

        fn begin_ad(&mut self, id: AdId) {
            self.calls.lock().unwrap().push(Call::BeginAd(id.0));
        }

        fn update_ad_progress(&mut self, id: AdId, progress: f64) {
            self.calls.lock().unwrap().push(Call::Progress(id.0, progress));
        }

        fn end_ad(&mut self, id: AdId) {
            self.calls.lock().unwrap().push(Call::EndAd(id.0));
        }

        fn skip_ad(&mut self, id: AdId) {
            self.calls.lock().unwrap().push(Call::SkipAd(id.0));
        }

        fn error(&mut self, _error: &crosswire_core::Error) {}
    }

    fn ad(duration: f64) -> UplynkAd {
        UplynkAd {
            duration,
            api_framework: None,
            creative: None,
            mime_type: None,
            width: 0,
            height: 0,
            events: HashMap::new(),
            fw_parameters: HashMap::new(),
        }
    }

    fn brk(offset: f64, ads: Vec<UplynkAd>) -> UplynkAdBreak {
        let duration = ads.iter().map(|a| a.duration).sum();
        UplynkAdBreak {
            time_offset: offset,
            duration,
            break_type: Some("linear".into()),
            position: None,
            ads,
            events: HashMap::new(),
        }
    }

    fn ads(breaks: Vec<UplynkAdBreak>) -> UplynkAds {
        UplynkAds {
            breaks,
            break_offsets: Vec::new(),
            placeholder_offsets: Vec::new(),
        }
    }

    fn calls_of(calls: &Arc<Mutex<Vec<Call>>>) -> Vec<Call> {
        calls.lock().unwrap().clone()
    }

    #[test]
    fn test_break_starts_when_playhead_enters() {
        let (controller, calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(10.0, vec![ad(15.0)])]));

        scheduler.on_time_update(5.0);
        assert!(calls_of(&calls).is_empty(), "nothing before the break");

        scheduler.on_time_update(10.0);
        let recorded = calls_of(&calls);
        assert_eq!(recorded[0], Call::CreateBreak(10.0, 15.0));
        assert_eq!(recorded[1], Call::CreateAd(2, 15.0));
        assert_eq!(recorded[2], Call::BeginAd(2));
    }

    #[test]
    fn test_progress_is_clamped_fraction() {
        let (controller, calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(0.0, vec![ad(10.0)])]));

        scheduler.on_time_update(0.0); // begins the ad
        scheduler.on_time_update(5.0);
        scheduler.on_time_update(9.9999);

        let recorded = calls_of(&calls);
        assert!(recorded.contains(&Call::Progress(2, 0.5)));
        let last = recorded.last().unwrap();
        match last {
            Call::Progress(_, p) => assert!(*p <= 1.0),
            other => panic!("expected progress, got {other:?}"),
        }
    }

    #[test]
    fn test_half_open_boundary_does_not_start_break() {
        let (controller, calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(10.0, vec![ad(5.0)])]));

        // Landing exactly on the end boundary must not start the break
        scheduler.on_time_update(15.0);
        assert!(calls_of(&calls).is_empty());
    }

    #[test]
    fn test_second_ad_completes_first() {
        let (controller, calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(0.0, vec![ad(10.0), ad(10.0)])]));

        scheduler.on_time_update(2.0);
        scheduler.on_time_update(12.0);

        let recorded = calls_of(&calls);
        assert!(recorded.contains(&Call::EndAd(2)), "first ad ended: {recorded:?}");
        assert!(recorded.contains(&Call::BeginAd(3)), "second ad began");
    }

    #[test]
    fn test_seek_into_break_skips_unplayed_ads() {
        let (controller, calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(0.0, vec![ad(10.0), ad(10.0), ad(10.0)])]));

        // Seek straight to the third ad; first two were never current
        scheduler.on_time_update(25.0);

        let recorded = calls_of(&calls);
        assert!(recorded.contains(&Call::SkipAd(2)));
        assert!(recorded.contains(&Call::SkipAd(3)));
        assert!(recorded.contains(&Call::BeginAd(4)));
    }

    #[test]
    fn test_seek_away_finishes_break_and_ends_active_ad() {
        let (controller, calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(0.0, vec![ad(10.0)])]));

        scheduler.on_time_update(2.0);
        scheduler.on_time_update(200.0); // seek far past the break

        let recorded = calls_of(&calls);
        assert!(recorded.contains(&Call::EndAd(2)));
        assert_eq!(scheduler.snapshot()[0].1, AdBreakState::Finished);
    }

    #[test]
    fn test_seek_back_restarts_without_new_records() {
        let (controller, calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(0.0, vec![ad(10.0)])]));

        scheduler.on_time_update(2.0);
        scheduler.on_time_update(50.0); // leave
        scheduler.on_time_update(3.0); // come back

        let recorded = calls_of(&calls);
        let creates = recorded
            .iter()
            .filter(|c| matches!(c, Call::CreateBreak(..)))
            .count();
        assert_eq!(creates, 1, "records are reused on re-entry: {recorded:?}");
        let begins = recorded.iter().filter(|c| matches!(c, Call::BeginAd(_))).count();
        assert_eq!(begins, 2, "the ad begins again on re-entry");
    }

    #[test]
    fn test_no_break_contains_time_finishes_started() {
        let (controller, _calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(0.0, vec![ad(10.0)]), brk(60.0, vec![ad(10.0)])]));

        scheduler.on_time_update(5.0);
        scheduler.on_time_update(30.0); // between the breaks

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot[0].1, AdBreakState::Finished);
        assert_eq!(snapshot[1].1, AdBreakState::NotPlayed);
    }

    #[test]
    fn test_zero_duration_ad_never_progresses() {
        let (controller, calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(0.0, vec![ad(0.0), ad(10.0)])]));

        scheduler.on_time_update(0.0);
        scheduler.on_time_update(5.0);

        let recorded = calls_of(&calls);
        // The zero-duration ad is skipped, never begun, never progressed
        assert!(recorded.contains(&Call::SkipAd(2)));
        assert!(!recorded.iter().any(|c| matches!(c, Call::Progress(2, _))));
    }

    #[test]
    fn test_merge_dedups_by_offset() {
        let (controller, _calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.merge(&ads(vec![brk(30.0, vec![ad(15.0)])]));
        scheduler.merge(&ads(vec![brk(30.0, vec![ad(15.0)]), brk(90.0, vec![ad(15.0)])]));

        assert_eq!(scheduler.break_count(), 2);
    }

    #[test]
    fn test_merge_updates_open_ended_duration() {
        let (controller, calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);

        let mut open = brk(30.0, vec![ad(15.0)]);
        open.duration = -1.0;
        scheduler.merge(&ads(vec![open]));
        scheduler.on_time_update(31.0); // starts the open-ended break

        let mut closed = brk(30.0, vec![ad(15.0)]);
        closed.duration = 15.0;
        scheduler.merge(&ads(vec![closed]));

        let recorded = calls_of(&calls);
        assert!(recorded.iter().any(|c| matches!(c, Call::UpdateBreak(_, d) if *d == 15.0)));
    }

    #[test]
    fn test_replace_removes_stale_breaks() {
        let (controller, calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(0.0, vec![ad(10.0)]), brk(60.0, vec![ad(10.0)])]));
        scheduler.on_time_update(1.0); // materialize the first break's records

        scheduler.replace(&ads(vec![brk(60.0, vec![ad(10.0)])]));

        let recorded = calls_of(&calls);
        assert!(recorded.iter().any(|c| matches!(c, Call::RemoveBreak(_))));
        assert_eq!(scheduler.break_count(), 1);
    }

    #[test]
    fn test_finish_all() {
        let (controller, _calls) = Recorder::new();
        let mut scheduler = UplynkAdScheduler::new(controller);
        scheduler.replace(&ads(vec![brk(0.0, vec![ad(10.0)])]));

        scheduler.on_time_update(5.0);
        scheduler.finish_all();

        assert_eq!(scheduler.snapshot()[0].1, AdBreakState::Finished);
    }
}
