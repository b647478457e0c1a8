//! Yospace session resolution and analytics schedule polling

use crate::config::{YospaceSsaiDescription, YospaceStreamType};
use crosswire_core::{Error, Result, SessionId};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Response header carrying the analytics endpoint for the session
const ANALYTICS_HEADER: &str = "x-yospace-analytics";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of session initialisation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session is live; ad tracking is active
    Initialised,
    /// The stream played back but the CSM offered no analytics; the stream
    /// plays without ad tracking
    NoAnalytics,
}

/// A resolved Yospace session
#[derive(Debug, Clone)]
pub struct YospaceSession {
    /// Connector-local session ID
    pub id: SessionId,
    /// Session-bound playback URL (after CSM redirects)
    pub playback_url: Url,
    /// Analytics endpoint for schedule polling, when offered
    pub analytics_url: Option<Url>,
    /// Stream class of the session
    pub stream_type: YospaceStreamType,
    /// Initialisation outcome
    pub state: SessionState,
}

/// Forward ad schedule returned by the analytics endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdBreakSchedule {
    #[serde(default)]
    pub breaks: Vec<ScheduledBreak>,
}

/// One scheduled ad break
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledBreak {
    /// Yospace break identifier, the dedup key
    pub id: String,
    /// Offset from stream start, in seconds
    pub start: f64,
    /// Break duration in seconds; negative when not yet known
    #[serde(default)]
    pub duration: f64,
    /// Adverts inside the break, in play order
    #[serde(default)]
    pub adverts: Vec<ScheduledAdvert>,
}

/// One scheduled advert
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledAdvert {
    /// Yospace advert (media) identifier
    pub id: String,
    /// Advert duration in seconds
    pub duration: f64,
    /// Clickthrough URL, if any
    #[serde(default)]
    pub clickthrough: Option<String>,
}

/// HTTP client for the Yospace CSM and analytics endpoints
#[derive(Debug, Clone)]
pub struct YospaceClient {
    http: Client,
}

impl YospaceClient {
    /// Create a client with the default timeout
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { http })
    }

    /// Create a client around an existing HTTP client
    pub fn with_http(http: Client) -> Self {
        Self { http }
    }

    /// Build the session-init URL: the stream URL plus the `yo.*` parameters
    pub fn build_session_url(src: &Url, stream_type: YospaceStreamType) -> Url {
        let mut url = src.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("yo.av", "4");
            if stream_type == YospaceStreamType::LivePause {
                query.append_pair("yo.lp", "true");
            }
        }
        url
    }

    /// Initialise a session against the CSM
    ///
    /// The response body is the stitched manifest and belongs to the player;
    /// the connector only needs the final URL and the analytics header.
    #[instrument(skip(self, description), fields(stream_type = ?description.stream_type))]
    pub async fn create_session(
        &self,
        src: &Url,
        description: &YospaceSsaiDescription,
    ) -> Result<YospaceSession> {
        let init_url = Self::build_session_url(src, description.stream_type);
        debug!(url = %init_url, "Yospace session init");

        let response = self.http.get(init_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::SessionInit(format!(
                "CSM answered {} for {}",
                status.as_u16(),
                init_url
            )));
        }

        let playback_url = response.url().clone();
        let analytics_url = response
            .headers()
            .get(ANALYTICS_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Url::parse(value).ok());

        let state = if analytics_url.is_some() {
            SessionState::Initialised
        } else {
            warn!("CSM offered no analytics; stream plays without ad tracking");
            SessionState::NoAnalytics
        };

        let session = YospaceSession {
            id: SessionId::new(),
            playback_url,
            analytics_url,
            stream_type: description.stream_type,
            state,
        };
        info!(id = %session.id, state = ?session.state, "Yospace session created");
        Ok(session)
    }

    /// Poll the analytics endpoint for the forward ad schedule
    #[instrument(skip(self, analytics_url))]
    pub async fn poll_schedule(
        &self,
        analytics_url: &Url,
        playhead: f64,
    ) -> Result<AdBreakSchedule> {
        let mut url = analytics_url.clone();
        url.query_pairs_mut()
            .append_pair("pt", &format!("{playhead:.2}"));

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::ResponseStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<AdBreakSchedule>().await?)
    }
}
