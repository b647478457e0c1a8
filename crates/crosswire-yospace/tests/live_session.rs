//! Live-session scenarios: schedule polling and metadata anchoring together

use crosswire_core::{AdBreakId, AdBreakInit, AdController, AdId, AdInit, Error};
use crosswire_yospace::{AdBreakSchedule, AdHandler, PlaybackPolicy, YospaceStreamType};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
    next_id: u64,
}

impl Journal {
    fn new() -> (Box<dyn AdController>, Arc<Mutex<Vec<String>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Journal {
                entries: entries.clone(),
                next_id: 0,
            }),
            entries,
        )
    }
}

impl AdController for Journal {
    fn create_ad_break(&mut self, init: AdBreakInit) -> AdBreakId {
        self.next_id += 1;
        self.entries
            .lock()
            .unwrap()
            .push(format!("break@{}", init.time_offset));
        AdBreakId(self.next_id)
    }
    fn update_ad_break(&mut self, _id: AdBreakId, _init: AdBreakInit) {}
    fn remove_ad_break(&mut self, _id: AdBreakId) {}
    fn create_ad(&mut self, _break_id: AdBreakId, init: AdInit) -> AdId {
        self.next_id += 1;
        self.entries
            .lock()
            .unwrap()
            .push(format!("ad:{}", init.creative_id.unwrap_or_default()));
        AdId(self.next_id)
    }
    fn begin_ad(&mut self, id: AdId) {
        self.entries.lock().unwrap().push(format!("begin:{}", id.0));
    }
    fn update_ad_progress(&mut self, _id: AdId, _progress: f64) {}
    fn end_ad(&mut self, id: AdId) {
        self.entries.lock().unwrap().push(format!("end:{}", id.0));
    }
    fn skip_ad(&mut self, id: AdId) {
        self.entries.lock().unwrap().push(format!("skip:{}", id.0));
    }
    fn error(&mut self, _error: &Error) {}
}

fn schedule_json(json: &str) -> AdBreakSchedule {
    serde_json::from_str(json).expect("fixture parses")
}

#[test]
fn test_live_break_from_schedule_then_metadata_close() {
    let (controller, entries) = Journal::new();
    let mut handler = AdHandler::new(controller);

    // Poll delivers the upcoming break
    handler.apply_schedule(&schedule_json(
        r#"{"breaks": [{"id": "b1", "start": 600.0, "duration": 30.0,
             "adverts": [{"id": "adv-1", "duration": 30.0}]}]}"#,
    ));

    // Playhead reaches the break
    handler.on_time_update(599.0);
    handler.on_time_update(601.0);
    handler.on_time_update(615.0);

    // A later poll re-delivers the same break: no duplicates
    handler.apply_schedule(&schedule_json(
        r#"{"breaks": [{"id": "b1", "start": 600.0, "duration": 30.0,
             "adverts": [{"id": "adv-1", "duration": 30.0}]}]}"#,
    ));
    assert_eq!(handler.break_count(), 1);

    // Stream moves on
    handler.on_time_update(631.0);

    let journal = entries.lock().unwrap().clone();
    assert_eq!(
        journal,
        vec!["break@600", "ad:adv-1", "begin:2", "end:2"],
        "unexpected journal: {journal:?}"
    );
}

#[test]
fn test_policy_follows_handler_state() {
    let (controller, _entries) = Journal::new();
    let mut handler = AdHandler::new(controller);
    let mut policy = PlaybackPolicy::new(YospaceStreamType::Vod);

    handler.apply_schedule(&schedule_json(
        r#"{"breaks": [{"id": "b1", "start": 120.0, "duration": 30.0,
             "adverts": [{"id": "adv-1", "duration": 30.0}]}]}"#,
    ));
    policy.set_breaks(handler.policy_breaks());

    // Unwatched: forward seeks clamp to the break
    assert_eq!(policy.clamp_seek(0.0, 400.0), 120.0);

    // Watch the break, then the clamp lifts
    handler.on_time_update(121.0);
    handler.on_time_update(151.0);
    policy.set_breaks(handler.policy_breaks());
    assert_eq!(policy.clamp_seek(0.0, 400.0), 400.0);
}
