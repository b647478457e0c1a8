//! Uplynk connector
//!
//! Activation resolves the preplay session and returns the rewritten source;
//! a background task then owns the scheduler for the rest of the session,
//! consuming the player bus and the ping back-channel. All scheduler
//! mutation happens on that one task.

use crate::api::UplynkClient;
use crate::config::UplynkSsaiDescription;
use crate::model::{AssetInfoResponse, PingResponse, UplynkDrm};
use crate::ping::{PingFeatures, PingScheduler};
use crate::scheduler::UplynkAdScheduler;
use async_trait::async_trait;
use crosswire_core::{
    AdController, Connector, Error, PlayerBus, PlayerEvent, Result, SessionId, SourceDescription,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Integration ID this connector claims on typed sources
pub const INTEGRATION_ID: &str = "uplynk";

/// Resolved session details, kept for introspection
#[derive(Debug, Clone)]
pub struct UplynkSession {
    /// Connector-local session ID (logs, vendor reports)
    pub session_id: SessionId,
    /// Platform session ID used by ping and session-scoped requests
    pub sid: String,
    /// Session-bound platform prefix
    pub prefix: String,
    /// Resolved playback URL
    pub play_url: Url,
    /// DRM parameters for protected sessions
    pub drm: Option<UplynkDrm>,
    /// Asset info, when requested by the description
    pub asset_info: Vec<AssetInfoResponse>,
}

/// Server-side ad-insertion connector for the Uplynk platform
pub struct UplynkConnector {
    client: Arc<UplynkClient>,
    session: Option<UplynkSession>,
    worker: Option<JoinHandle<()>>,
}

impl UplynkConnector {
    /// Create a connector with a default HTTP client
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(UplynkClient::new()?))
    }

    /// Create a connector around an existing client
    pub fn with_client(client: UplynkClient) -> Self {
        Self {
            client: Arc::new(client),
            session: None,
            worker: None,
        }
    }

    /// The resolved session, once [`activate`](Self::activate) succeeded
    pub fn session(&self) -> Option<&UplynkSession> {
        self.session.as_ref()
    }

    /// Resolve the session and start reconciling against the player
    ///
    /// Finds the typed source claiming the `uplynk` integration, resolves it
    /// through preplay, and returns the description with that source
    /// rewritten to the session play URL. Scheduling runs in the background
    /// until [`detach`](Connector::detach) or bus shutdown.
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

        let ssai = source.ssai.clone().ok_or(Error::MissingSsaiDescription {
            integration: INTEGRATION_ID,
        })?;
        let ssai: UplynkSsaiDescription = serde_json::from_value(ssai)
            .map_err(|e| Error::InvalidSsaiDescription(e.to_string()))?;

        let preplay = match self.client.preplay(&ssai).await {
            Ok(preplay) => preplay,
            Err(error) => {
                controller.error(&error);
                return Err(error);
            }
        };
        let play_url = Url::parse(&preplay.play_url)?;

        let session_id = SessionId::new();
        info!(
            %session_id,
            sid = %preplay.sid,
            live = ssai.asset_type.is_live(),
            "Uplynk session resolved"
        );

        // Asset info failures are recoverable: log and continue without it
        let mut asset_info = Vec::new();
        if ssai.asset_info {
            for asset_id in &ssai.asset_ids {
                match self
                    .client
                    .asset_info(&preplay.prefix, asset_id, Some(&preplay.sid))
                    .await
                {
                    Ok(info) => asset_info.push(info),
                    Err(error) => {
                        warn!(asset = %asset_id, %error, "Asset info unavailable")
                    }
                }
            }
        }

        let mut scheduler = UplynkAdScheduler::new(controller);
        if let Some(ads) = &preplay.ads {
            scheduler.replace(ads);
        }

        let features = PingFeatures::resolve(&ssai.ping_configuration, ssai.asset_type);
        let ping = PingScheduler::new(features);

        let worker = tokio::spawn(run_session(
            self.client.clone(),
            preplay.prefix.clone(),
            preplay.sid.clone(),
            scheduler,
            ping,
            bus.subscribe(),
        ));
        self.worker = Some(worker);

        self.session = Some(UplynkSession {
            session_id,
            sid: preplay.sid,
            prefix: preplay.prefix,
            play_url: play_url.clone(),
            drm: preplay.drm,
            asset_info,
        });

        Ok(description.with_source_at(index, source.resolved(play_url)))
    }
}

#[async_trait]
impl Connector for UplynkConnector {
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

impl Drop for UplynkConnector {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

/// Session event loop: one logical thread owning all scheduler state
async fn run_session(
    client: Arc<UplynkClient>,
    prefix: String,
    sid: String,
    mut scheduler: UplynkAdScheduler,
    mut ping: PingScheduler,
    mut events: broadcast::Receiver<PlayerEvent>,
) {
    let (ping_tx, mut ping_rx) = mpsc::channel::<Result<PingResponse>>(4);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => handle_event(
                    &event, &client, &prefix, &sid, &mut scheduler, &mut ping, &ping_tx,
                ),
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(sid = %sid, "Player bus closed; session loop exiting");
                    scheduler.finish_all();
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(sid = %sid, skipped, "Session loop lagged behind the bus");
                }
            },
            Some(result) = ping_rx.recv() => match result {
                Ok(response) => {
                    if let Some(error) = &response.error {
                        warn!(sid = %sid, error, "Ping returned a platform error");
                    }
                    if let Some(ads) = &response.ads {
                        scheduler.merge(ads);
                    }
                    ping.on_response(&response);
                }
                Err(error) => {
                    warn!(sid = %sid, %error, "Ping request failed");
                    ping.on_request_failed();
                }
            },
        }
    }
}

fn handle_event(
    event: &PlayerEvent,
    client: &Arc<UplynkClient>,
    prefix: &str,
    sid: &str,
    scheduler: &mut UplynkAdScheduler,
    ping: &mut PingScheduler,
    ping_tx: &mpsc::Sender<Result<PingResponse>>,
) {
    match event {
        PlayerEvent::TimeUpdate { current_time } => {
            scheduler.on_time_update(*current_time);
            if ping.due(*current_time) {
                send_ping(client, prefix, sid, *current_time, None, ping, ping_tx);
            }
        }
        PlayerEvent::Playing { position } => {
            if ping.due(*position) {
                send_ping(client, prefix, sid, *position, Some("start"), ping, ping_tx);
            }
        }
        PlayerEvent::Seeking { to } => {
            if ping.wants_seek_events() {
                send_ping(client, prefix, sid, *to, Some("seek"), ping, ping_tx);
            }
        }
        PlayerEvent::Seeked { at } => {
            // Reconcile immediately instead of waiting for the next tick
            scheduler.on_time_update(*at);
        }
        PlayerEvent::Ended => {
            scheduler.finish_all();
        }
        _ => {}
    }
}

/// Fire a ping on a background task; the result comes back on the channel
fn send_ping(
    client: &Arc<UplynkClient>,
    prefix: &str,
    sid: &str,
    playhead: f64,
    event: Option<&str>,
    ping: &mut PingScheduler,
    ping_tx: &mpsc::Sender<Result<PingResponse>>,
) {
    ping.begin_request();
    let client = client.clone();
    let prefix = prefix.to_string();
    let sid = sid.to_string();
    let event = event.map(str::to_string);
    let tx = ping_tx.clone();
    tokio::spawn(async move {
        let result = client.ping(&prefix, &sid, playhead, event.as_deref()).await;
        let _ = tx.send(result).await;
    });
}
