//! Advert handling
//!
//! [`AdHandler`] reconciles the Yospace break schedule against the player
//! playhead with the same discipline as the Uplynk scheduler: half-open
//! break intervals, lifecycle owned exclusively by the handler, controller
//! records created the first time a break starts and reused afterwards.
//!
//! Live streams additionally anchor on timed metadata: a `YTYP=S` group for
//! an unknown advert opens a break at the frame's stream time, and a
//! `YTYP=E` group closes the advert regardless of playhead drift.

use crate::metadata::YospaceMetadata;
use crate::policy::PolicyBreak;
use crate::session::{AdBreakSchedule, ScheduledBreak};
use crosswire_core::{AdBreakId, AdBreakInit, AdBreakState, AdController, AdId, AdInit, AdState};
use tracing::{debug, warn};

#[derive(Debug)]
struct BreakHandle {
    yospace_id: String,
    remote: Option<AdBreakId>,
    start: f64,
    duration: f64,
    state: AdBreakState,
    adverts: Vec<AdvertHandle>,
}

#[derive(Debug)]
struct AdvertHandle {
    yospace_id: String,
    remote: Option<AdId>,
    start: f64,
    duration: f64,
    clickthrough: Option<String>,
    state: AdState,
}

impl BreakHandle {
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

    fn remote(&self) -> AdBreakId {
        match self.remote {
            Some(id) => id,
            None => panic!(
                "break '{}' has no controller record; handler out of sync",
                self.yospace_id
            ),
        }
    }
}

impl AdvertHandle {
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
                "advert '{}' has no controller record; handler out of sync",
                self.yospace_id
            ),
        }
    }
}

/// Reconciles Yospace adverts against the playhead
pub struct AdHandler {
    breaks: Vec<BreakHandle>,
    controller: Box<dyn AdController>,
}

impl AdHandler {
    pub fn new(controller: Box<dyn AdController>) -> Self {
        Self {
            breaks: Vec::new(),
            controller,
        }
    }

    /// Number of breaks currently tracked
    pub fn break_count(&self) -> usize {
        self.breaks.len()
    }

    /// Apply a polled schedule, deduplicating by Yospace break ID
    ///
    /// Known breaks keep their records and lifecycle; timing is refreshed.
    /// Breaks that vanished from the schedule before ever starting are
    /// dropped - the rolling live window no longer covers them.
    pub fn apply_schedule(&mut self, schedule: &AdBreakSchedule) {
        for brk in &schedule.breaks {
            let known_index = self.breaks.iter().position(|h| h.yospace_id == brk.id);
            match known_index {
                Some(index) => {
                    let known = &mut self.breaks[index];
                    if known.duration != brk.duration || known.start != brk.start {
                        known.start = brk.start;
                        known.duration = brk.duration;
                        relayout_adverts(known);
                        if let Some(id) = known.remote {
                            let init = AdBreakInit::new(known.start, known.duration);
                            self.controller.update_ad_break(id, init);
                        }
                    }
                }
                None => {
                    debug!(id = %brk.id, start = brk.start, "Scheduled ad break");
                    self.breaks.push(new_handle(brk));
                }
            }
        }

        self.breaks.retain(|handle| {
            let still_scheduled = schedule.breaks.iter().any(|b| b.id == handle.yospace_id);
            if still_scheduled || handle.state != AdBreakState::NotPlayed {
                return true;
            }
            debug!(id = %handle.yospace_id, "Dropping break outside the schedule window");
            false
        });

        self.breaks
            .sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Anchor on a timed-metadata group
    pub fn on_metadata(&mut self, metadata: &YospaceMetadata) {
        if metadata.is_advert_start() {
            let known = self
                .breaks
                .iter()
                .any(|b| b.adverts.iter().any(|a| a.yospace_id == metadata.media_id));
            if !known {
                // An advert the schedule never told us about: open a break
                // for it at the frame's stream time
                let duration = metadata.duration.unwrap_or(-1.0);
                warn!(
                    media_id = %metadata.media_id,
                    time = metadata.time,
                    "Unscheduled advert from metadata"
                );
                self.breaks.push(BreakHandle {
                    yospace_id: format!("meta:{}", metadata.media_id),
                    remote: None,
                    start: metadata.time,
                    duration,
                    state: AdBreakState::NotPlayed,
                    adverts: vec![AdvertHandle {
                        yospace_id: metadata.media_id.clone(),
                        remote: None,
                        start: metadata.time,
                        duration,
                        clickthrough: None,
                        state: AdState::NotPlayed,
                    }],
                });
                self.breaks.sort_by(|a, b| {
                    a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            self.on_time_update(metadata.time);
        } else if metadata.is_advert_end() {
            self.close_advert(&metadata.media_id);
        }
    }

    /// Reconcile against the current playhead
    pub fn on_time_update(&mut self, time: f64) {
        let active = (0..self.breaks.len()).find(|&i| self.breaks[i].contains(time));
        if let Some(index) = active {
            self.advance_break(index, time);
        }
        self.retire_breaks(active);
    }

    /// Finish everything still in flight
    pub fn finish_all(&mut self) {
        self.retire_breaks(None);
    }

    /// View of the tracked breaks for the playback policy
    pub fn policy_breaks(&self) -> Vec<PolicyBreak> {
        self.breaks
            .iter()
            .map(|b| PolicyBreak {
                start: b.start,
                duration: b.duration,
                finished: b.state == AdBreakState::Finished,
            })
            .collect()
    }

    fn advance_break(&mut self, index: usize, time: f64) {
        if self.breaks[index].state != AdBreakState::Started {
            self.materialize(index);
            debug!(
                id = %self.breaks[index].yospace_id,
                from = %self.breaks[index].state,
                "Ad break started"
            );
            self.breaks[index].state = AdBreakState::Started;
        }

        let current = self.breaks[index]
            .adverts
            .iter()
            .position(|a| a.contains(time));
        let until = match current {
            Some(advert_index) => self.breaks[index].adverts[advert_index].start,
            None => time,
        };

        // Everything the playhead moved past is done
        {
            let brk = &mut self.breaks[index];
            for advert in &mut brk.adverts {
                let passed = if advert.duration > 0.0 {
                    advert.end() <= until
                } else {
                    advert.start <= until
                };
                if !passed || advert.state == AdState::Completed {
                    continue;
                }
                match advert.state {
                    AdState::Started => self.controller.end_ad(advert.remote()),
                    _ => self.controller.skip_ad(advert.remote()),
                }
                advert.state = AdState::Completed;
            }
        }

        if let Some(advert_index) = current {
            let advert = &mut self.breaks[index].adverts[advert_index];
            match advert.state {
                AdState::NotPlayed | AdState::Completed => {
                    debug!(id = %advert.yospace_id, "Advert started");
                    self.controller.begin_ad(advert.remote());
                    advert.state = AdState::Started;
                }
                AdState::Started => {
                    if advert.duration > 0.0 {
                        let progress = ((time - advert.start) / advert.duration).clamp(0.0, 1.0);
                        self.controller.update_ad_progress(advert.remote(), progress);
                    }
                }
            }
        }
    }

    /// Create controller records for a break on first start
    fn materialize(&mut self, index: usize) {
        let brk = &mut self.breaks[index];
        if brk.remote.is_some() {
            return;
        }
        let id = self
            .controller
            .create_ad_break(AdBreakInit::new(brk.start, brk.duration).with_break_type("linear"));
        brk.remote = Some(id);
        for advert in &mut brk.adverts {
            let mut init = AdInit::new(advert.duration).with_creative_id(advert.yospace_id.clone());
            init.clickthrough = advert.clickthrough.clone();
            advert.remote = Some(self.controller.create_ad(id, init));
        }
    }

    fn retire_breaks(&mut self, active: Option<usize>) {
        for index in 0..self.breaks.len() {
            if Some(index) == active || self.breaks[index].state != AdBreakState::Started {
                continue;
            }
            let brk = &mut self.breaks[index];
            for advert in &mut brk.adverts {
                if advert.state == AdState::Started {
                    self.controller.end_ad(advert.remote());
                    advert.state = AdState::Completed;
                }
            }
            debug!(id = %brk.yospace_id, "Ad break finished");
            brk.state = AdBreakState::Finished;
        }
    }

    /// Force-close an advert signalled done by metadata
    fn close_advert(&mut self, media_id: &str) {
        for brk in &mut self.breaks {
            if let Some(advert) = brk
                .adverts
                .iter_mut()
                .find(|a| a.yospace_id == media_id && a.state == AdState::Started)
            {
                debug!(id = %media_id, "Advert closed by metadata");
                self.controller.end_ad(advert.remote());
                advert.state = AdState::Completed;

                // A live break with a single metadata-born advert closes too
                if brk.adverts.iter().all(|a| a.state == AdState::Completed) {
                    brk.state = AdBreakState::Finished;
                }
                return;
            }
        }
    }
}

impl std::fmt::Debug for AdHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdHandler")
            .field("breaks", &self.breaks)
            .finish_non_exhaustive()
    }
}

fn new_handle(brk: &ScheduledBreak) -> BreakHandle {
    let mut adverts = Vec::with_capacity(brk.adverts.len());
    let mut cursor = brk.start;
    for advert in &brk.adverts {
        adverts.push(AdvertHandle {
            yospace_id: advert.id.clone(),
            remote: None,
            start: cursor,
            duration: advert.duration,
            clickthrough: advert.clickthrough.clone(),
            state: AdState::NotPlayed,
        });
        cursor += advert.duration;
    }
    BreakHandle {
        yospace_id: brk.id.clone(),
        remote: None,
        start: brk.start,
        duration: brk.duration,
        state: AdBreakState::NotPlayed,
        adverts,
    }
}

fn relayout_adverts(brk: &mut BreakHandle) {
    let mut cursor = brk.start;
    for advert in &mut brk.adverts {
        advert.start = cursor;
        cursor += advert.duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::YospaceSegmentType;
    use crate::session::ScheduledAdvert;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CreateBreak(f64),
        UpdateBreak(f64),
        RemoveBreak,
        CreateAd(String),
        Begin(u64),
        Progress(u64),
        End(u64),
        Skip(u64),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<Call>>>,
        next_id: u64,
    }

    impl Recorder {
        fn new() -> (Box<dyn AdController>, Arc<Mutex<Vec<Call>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Box::new(Recorder {
                    calls: calls.clone(),
                    next_id: 0,
                }),
                calls,
            )
        }
    }

    impl AdController for Recorder {
        fn create_ad_break(&mut self, init: AdBreakInit) -> AdBreakId {
            self.next_id += 1;
            self.calls.lock().unwrap().push(Call::CreateBreak(init.time_offset));
            AdBreakId(self.next_id)
        }
        fn update_ad_break(&mut self, _id: AdBreakId, init: AdBreakInit) {
            self.calls.lock().unwrap().push(Call::UpdateBreak(init.duration));
        }
        fn remove_ad_break(&mut self, _id: AdBreakId) {
            self.calls.lock().unwrap().push(Call::RemoveBreak);
        }
        fn create_ad(&mut self, _break_id: AdBreakId, init: AdInit) -> AdId {
            self.next_id += 1;
            self.calls
                .lock()
                .unwrap()
                .push(Call::CreateAd(init.creative_id.unwrap_or_default()));
            AdId(self.next_id)
        }
        fn begin_ad(&mut self, id: AdId) {
            self.calls.lock().unwrap().push(Call::Begin(id.0));
        }
        fn update_ad_progress(&mut self, id: AdId, _progress: f64) {
            self.calls.lock().unwrap().push(Call::Progress(id.0));
        }
        fn end_ad(&mut self, id: AdId) {
            self.calls.lock().unwrap().push(Call::End(id.0));
        }
        fn skip_ad(&mut self, id: AdId) {
            self.calls.lock().unwrap().push(Call::Skip(id.0));
        }
        fn error(&mut self, _error: &crosswire_core::Error) {}
    }

    fn schedule(breaks: Vec<ScheduledBreak>) -> AdBreakSchedule {
        AdBreakSchedule { breaks }
    }

    fn brk(id: &str, start: f64, advert_durations: &[f64]) -> ScheduledBreak {
        ScheduledBreak {
            id: id.into(),
            start,
            duration: advert_durations.iter().sum(),
            adverts: advert_durations
                .iter()
                .enumerate()
                .map(|(i, d)| ScheduledAdvert {
                    id: format!("{id}-adv{i}"),
                    duration: *d,
                    clickthrough: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_schedule_dedup_by_id() {
        let (controller, _calls) = Recorder::new();
        let mut handler = AdHandler::new(controller);

        handler.apply_schedule(&schedule(vec![brk("b1", 60.0, &[15.0])]));
        handler.apply_schedule(&schedule(vec![brk("b1", 60.0, &[15.0]), brk("b2", 300.0, &[30.0])]));
        assert_eq!(handler.break_count(), 2);
    }

    #[test]
    fn test_playthrough() {
        let (controller, calls) = Recorder::new();
        let mut handler = AdHandler::new(controller);
        handler.apply_schedule(&schedule(vec![brk("b1", 60.0, &[15.0, 15.0])]));

        let mut t = 59.0;
        while t <= 91.0 {
            handler.on_time_update(t);
            t += 0.5;
        }

        let recorded = calls.lock().unwrap().clone();
        assert_eq!(recorded[0], Call::CreateBreak(60.0));
        assert!(recorded.contains(&Call::Begin(2)));
        assert!(recorded.contains(&Call::End(2)));
        assert!(recorded.contains(&Call::Begin(3)));
        assert!(recorded.contains(&Call::End(3)));
    }

    #[test]
    fn test_unscheduled_advert_from_metadata() {
        let (controller, calls) = Recorder::new();
        let mut handler = AdHandler::new(controller);

        let meta = YospaceMetadata {
            media_id: "adv-live".into(),
            segment_type: YospaceSegmentType::Start,
            sequence: 1,
            sequence_count: 1,
            duration: Some(20.0),
            program_id: None,
            time: 500.0,
        };
        handler.on_metadata(&meta);

        let recorded = calls.lock().unwrap().clone();
        assert_eq!(recorded[0], Call::CreateBreak(500.0));
        assert!(recorded.contains(&Call::CreateAd("adv-live".into())));
        assert!(recorded.contains(&Call::Begin(2)));
    }

    #[test]
    fn test_metadata_end_closes_advert_and_break() {
        let (controller, calls) = Recorder::new();
        let mut handler = AdHandler::new(controller);

        let start = YospaceMetadata {
            media_id: "adv-live".into(),
            segment_type: YospaceSegmentType::Start,
            sequence: 1,
            sequence_count: 3,
            duration: Some(20.0),
            program_id: None,
            time: 500.0,
        };
        handler.on_metadata(&start);

        let end = YospaceMetadata {
            segment_type: YospaceSegmentType::End,
            sequence: 3,
            ..start
        };
        handler.on_metadata(&end);

        let recorded = calls.lock().unwrap().clone();
        assert!(recorded.contains(&Call::End(2)), "{recorded:?}");
        assert!(handler.policy_breaks()[0].finished);
    }

    #[test]
    fn test_schedule_window_drops_unplayed_breaks() {
        let (controller, _calls) = Recorder::new();
        let mut handler = AdHandler::new(controller);

        handler.apply_schedule(&schedule(vec![brk("b1", 60.0, &[15.0])]));
        // Next poll: the window moved on and b1 never played
        handler.apply_schedule(&schedule(vec![brk("b2", 300.0, &[30.0])]));
        assert_eq!(handler.break_count(), 1);
        assert_eq!(handler.policy_breaks()[0].start, 300.0);
    }

    #[test]
    fn test_started_break_survives_window() {
        let (controller, _calls) = Recorder::new();
        let mut handler = AdHandler::new(controller);

        handler.apply_schedule(&schedule(vec![brk("b1", 60.0, &[15.0])]));
        handler.on_time_update(61.0);
        handler.apply_schedule(&schedule(vec![brk("b2", 300.0, &[30.0])]));
        assert_eq!(handler.break_count(), 2);
    }

    #[test]
    fn test_duration_update_relayouts() {
        let (controller, calls) = Recorder::new();
        let mut handler = AdHandler::new(controller);

        let mut open = brk("b1", 60.0, &[15.0]);
        open.duration = -1.0;
        handler.apply_schedule(&schedule(vec![open]));
        handler.on_time_update(61.0);

        handler.apply_schedule(&schedule(vec![brk("b1", 60.0, &[15.0])]));
        let recorded = calls.lock().unwrap().clone();
        assert!(recorded.contains(&Call::UpdateBreak(15.0)), "{recorded:?}");
    }
}
