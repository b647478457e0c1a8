//! Uplynk platform HTTP API
//!
//! Three GET endpoints: preplay (session resolution), session ping, and
//! asset info. URL building is pure and unit-tested; the async calls are
//! thin wrappers around them.

use crate::config::{UplynkAssetType, UplynkSsaiDescription};
use crate::model::{AssetInfoResponse, PingResponse, PreplayResponse};
use crate::ping::PingFeatures;
use crosswire_core::{Error, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Public content endpoint, used when the description has no prefix
pub const DEFAULT_PREFIX: &str = "https://content.uplynk.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the Uplynk platform endpoints
#[derive(Debug, Clone)]
pub struct UplynkClient {
    http: Client,
}

impl UplynkClient {
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

    /// Build the preplay URL for a session description
    pub fn build_preplay_url(description: &UplynkSsaiDescription) -> Result<Url> {
        let prefix = description.prefix.as_deref().unwrap_or(DEFAULT_PREFIX);
        let path = preplay_path(description)?;
        let mut url = Url::parse(&format!("{}/{}", prefix.trim_end_matches('/'), path))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("v", "2");

            if description.content_protected {
                query.append_pair("manifest", "mpd");
                query.append_pair("rmt", "wv");
            }

            for (key, value) in &description.preplay_parameters {
                query.append_pair(key, value);
            }

            let features =
                PingFeatures::resolve(&description.ping_configuration, description.asset_type);
            if features.any() {
                query.append_pair("ad.cping", "1");
                query.append_pair("ad.pingf", &features.bitmask().to_string());
            }
        }

        Ok(url)
    }

    /// Build the ping URL for a resolved session
    pub fn build_ping_url(
        prefix: &str,
        sid: &str,
        playhead: f64,
        event: Option<&str>,
    ) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/session/ping/{}.json",
            prefix.trim_end_matches('/'),
            sid
        ))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("v", "3");
            query.append_pair("pt", &format_seconds(playhead));
            if let Some(event) = event {
                query.append_pair("ev", event);
            }
        }
        Ok(url)
    }

    /// Build the asset-info URL for an asset, session-scoped when a sid exists
    pub fn build_asset_info_url(prefix: &str, asset_id: &str, sid: Option<&str>) -> Result<Url> {
        let prefix = prefix.trim_end_matches('/');
        let url = match sid {
            Some(sid) => format!("{prefix}/player/assetinfo/session/{sid}/{asset_id}.json"),
            None => format!("{prefix}/player/assetinfo/{asset_id}.json"),
        };
        Ok(Url::parse(&url)?)
    }

    /// Resolve a playback session
    #[instrument(skip(self, description), fields(asset_type = ?description.asset_type))]
    pub async fn preplay(&self, description: &UplynkSsaiDescription) -> Result<PreplayResponse> {
        let url = Self::build_preplay_url(description)?;
        debug!(url = %url, "Preplay request");

        let mut response: PreplayResponse = self.get_json(url).await?;
        if let Some(error) = response.error.take() {
            return Err(Error::Preplay(error));
        }
        Ok(response)
    }

    /// Report playhead progress and collect new ad data
    #[instrument(skip(self))]
    pub async fn ping(
        &self,
        prefix: &str,
        sid: &str,
        playhead: f64,
        event: Option<&str>,
    ) -> Result<PingResponse> {
        let url = Self::build_ping_url(prefix, sid, playhead, event)?;
        self.get_json(url).await
    }

    /// Fetch descriptive metadata for an asset
    #[instrument(skip(self))]
    pub async fn asset_info(
        &self,
        prefix: &str,
        asset_id: &str,
        sid: Option<&str>,
    ) -> Result<AssetInfoResponse> {
        let url = Self::build_asset_info_url(prefix, asset_id, sid)?;
        self.get_json(url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::ResponseStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

/// Path portion of a preplay URL, derived from IDs and asset type
fn preplay_path(description: &UplynkSsaiDescription) -> Result<String> {
    let segment = description.asset_type.path_segment();

    if !description.asset_ids.is_empty() {
        let ids = description.asset_ids.join(",");
        let suffix = if description.asset_type == UplynkAssetType::Asset
            && description.asset_ids.len() > 1
        {
            format!("{ids}/multiple.json")
        } else {
            format!("{ids}.json")
        };
        return Ok(match segment {
            Some(segment) => format!("preplay/{segment}/{suffix}"),
            None => format!("preplay/{suffix}"),
        });
    }

    if !description.external_ids.is_empty() {
        let user_id = description.user_id.as_deref().ok_or_else(|| {
            Error::InvalidConfig("external IDs require a user ID".to_string())
        })?;
        let ids = description.external_ids.join(",");
        return Ok(match segment {
            Some(segment) => format!("preplay/{segment}/ext/{user_id}/{ids}.json"),
            None => format!("preplay/ext/{user_id}/{ids}.json"),
        });
    }

    Err(Error::InvalidConfig(
        "description carries neither asset IDs nor external IDs".to_string(),
    ))
}

/// Seconds with centisecond precision, no trailing zeros beyond that
fn format_seconds(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let mut s = format!("{rounded:.2}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}
