//! Yospace connector
//!
//! Activation initialises the session and returns the rewritten source; a
//! background task then owns the ad handler, consuming the player bus, the
//! timed-metadata stream, and the analytics poll back-channel. The playback
//! policy snapshot is shared with the host through a lock, refreshed by the
//! session task after every schedule change.

use crate::adhandler::AdHandler;
use crate::config::YospaceSsaiDescription;
use crate::policy::PlaybackPolicy;
use crate::session::{AdBreakSchedule, SessionState, YospaceClient, YospaceSession};
use crate::metadata::YospaceMetadata;
use async_trait::async_trait;
use crosswire_core::{
    AdController, Connector, Error, PlayerBus, PlayerEvent, Result, SourceDescription,
};
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Integration ID this connector claims on typed sources
pub const INTEGRATION_ID: &str = "yospace";

/// Playhead seconds between analytics polls on live sessions
const SCHEDULE_POLL_INTERVAL: f64 = 10.0;

/// Server-side ad-insertion connector for the Yospace platform
pub struct YospaceConnector {
    client: Arc<YospaceClient>,
    session: Option<YospaceSession>,
    policy: Arc<RwLock<PlaybackPolicy>>,
    worker: Option<JoinHandle<()>>,
}

impl YospaceConnector {
    /// Create a connector with a default HTTP client
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(YospaceClient::new()?))
    }

    /// Create a connector around an existing client
    pub fn with_client(client: YospaceClient) -> Self {
        Self {
            client: Arc::new(client),
            session: None,
            policy: Arc::new(RwLock::new(PlaybackPolicy::new(Default::default()))),
            worker: None,
        }
    }

    /// The resolved session, once [`activate`](Self::activate) succeeded
    pub fn session(&self) -> Option<&YospaceSession> {
        self.session.as_ref()
    }

    /// Shared playback-policy handle for the host
    pub fn policy(&self) -> Arc<RwLock<PlaybackPolicy>> {
        self.policy.clone()
    }

    /// Initialise the session and start ad handling
    ///
    /// A session without analytics is not fatal: the rewritten source is
    /// still returned and the stream plays, just without ad tracking.
    #[instrument(skip_all)]
    pub async fn activate(
        &mut self,
        description: &SourceDescription,
        mut controller: Box<dyn AdController>,
        bus: &PlayerBus,
    ) -> Result<SourceDescription> {
        let (index, source) = description
            .sources
            .iter()
            .enumerate()
            .find(|(_, s)| s.integration.as_deref() == Some(INTEGRATION_ID))
            .ok_or(Error::MissingSsaiDescription {
                integration: INTEGRATION_ID,
            })?;

        let ssai: YospaceSsaiDescription = match &source.ssai {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::InvalidSsaiDescription(e.to_string()))?,
            None => YospaceSsaiDescription::default(),
        };

        let session = match self.client.create_session(&source.src, &ssai).await {
            Ok(session) => session,
            Err(error) => {
                controller.error(&error);
                return Err(error);
            }
        };

        if let Ok(mut guard) = self.policy.write() {
            *guard = PlaybackPolicy::new(ssai.stream_type);
        }

        let playback_url: Url = session.playback_url.clone();
        let rewritten = description.with_source_at(index, source.resolved(playback_url));

        if session.state == SessionState::NoAnalytics {
            // Playable, but nothing to reconcile against
            self.session = Some(session);
            return Ok(rewritten);
        }

        info!(id = %session.id, "Yospace ad handling active");
        let handler = AdHandler::new(controller);
        let worker = tokio::spawn(run_session(
            self.client.clone(),
            session.clone(),
            handler,
            self.policy.clone(),
            bus.subscribe(),
        ));
        self.worker = Some(worker);
        self.session = Some(session);

        Ok(rewritten)
    }
}

#[async_trait]
impl Connector for YospaceConnector {
    fn name(&self) -> &'static str {
        INTEGRATION_ID
    }

    async fn detach(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        self.session = None;
    }
}

impl Drop for YospaceConnector {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

/// Session event loop: one logical thread owning all handler state
async fn run_session(
    client: Arc<YospaceClient>,
    session: YospaceSession,
    mut handler: AdHandler,
    policy: Arc<RwLock<PlaybackPolicy>>,
    mut events: broadcast::Receiver<PlayerEvent>,
) {
    let (poll_tx, mut poll_rx) = mpsc::channel::<Result<AdBreakSchedule>>(4);
    let mut next_poll = 0.0_f64;
    let mut poll_in_flight = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    handle_event(
                        &event, &client, &session, &mut handler,
                        &mut next_poll, &mut poll_in_flight, &poll_tx,
                    );
                    refresh_policy(&policy, &handler);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(id = %session.id, "Player bus closed; session loop exiting");
                    handler.finish_all();
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(id = %session.id, skipped, "Session loop lagged behind the bus");
                }
            },
            Some(result) = poll_rx.recv() => {
                poll_in_flight = false;
                match result {
                    Ok(schedule) => {
                        handler.apply_schedule(&schedule);
                        refresh_policy(&policy, &handler);
                    }
                    Err(error) => warn!(id = %session.id, %error, "Schedule poll failed"),
                }
            },
        }
    }
}

fn handle_event(
    event: &PlayerEvent,
    client: &Arc<YospaceClient>,
    session: &YospaceSession,
    handler: &mut AdHandler,
    next_poll: &mut f64,
    poll_in_flight: &mut bool,
    poll_tx: &mpsc::Sender<Result<AdBreakSchedule>>,
) {
    match event {
        PlayerEvent::TimeUpdate { current_time } => {
            handler.on_time_update(*current_time);
            let due = session.stream_type.is_live() || *next_poll == 0.0;
            if due && *current_time >= *next_poll && !*poll_in_flight {
                if let Some(analytics_url) = &session.analytics_url {
                    *poll_in_flight = true;
                    *next_poll = *current_time + SCHEDULE_POLL_INTERVAL;
                    let client = client.clone();
                    let analytics_url = analytics_url.clone();
                    let playhead = *current_time;
                    let tx = poll_tx.clone();
                    tokio::spawn(async move {
                        let result = client.poll_schedule(&analytics_url, playhead).await;
                        let _ = tx.send(result).await;
                    });
                }
            }
        }
        PlayerEvent::Seeked { at } => {
            handler.on_time_update(*at);
        }
        PlayerEvent::TimedMetadata { frames } => match YospaceMetadata::from_frames(frames) {
            Ok(Some(metadata)) => handler.on_metadata(&metadata),
            Ok(None) => {}
            Err(error) => warn!(%error, "Ignoring malformed timed metadata"),
        },
        PlayerEvent::Ended => handler.finish_all(),
        _ => {}
    }
}

fn refresh_policy(policy: &Arc<RwLock<PlaybackPolicy>>, handler: &AdHandler) {
    if let Ok(mut guard) = policy.write() {
        guard.set_breaks(handler.policy_breaks());
    }
}
