//! Beacon transport
//!
//! Buffers vendor reports and posts them as JSON batches. Delivery is
//! fire-and-forget: a failed batch is logged and dropped, never retried, and
//! never stalls the player event loop.

use chrono::{DateTime, Utc};
use crosswire_core::SessionId;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Batch size that triggers a flush
const DEFAULT_MAX_BATCH: usize = 50;

/// A vendor report with delivery metadata
#[derive(Debug, Clone, Serialize)]
pub struct BeaconRecord {
    /// Unique record ID
    pub id: Uuid,
    /// Session the record belongs to
    pub session_id: SessionId,
    /// Wall-clock emission time
    pub timestamp: DateTime<Utc>,
    /// Per-session sequence number
    pub sequence: u64,
    /// Vendor the record is addressed to
    pub vendor: &'static str,
    /// The vendor-shaped report body
    #[serde(flatten)]
    pub body: serde_json::Value,
}

/// Buffered JSON batch poster for one vendor
pub struct Beacon {
    vendor: &'static str,
    session_id: SessionId,
    endpoint: Option<Url>,
    http: reqwest::Client,
    sequence: RwLock<u64>,
    buffer: RwLock<Vec<BeaconRecord>>,
    max_batch: usize,
}

impl Beacon {
    /// Create a buffering beacon with no endpoint (records accumulate)
    pub fn new(vendor: &'static str) -> Self {
        Self {
            vendor,
            session_id: SessionId::new(),
            endpoint: None,
            http: reqwest::Client::new(),
            sequence: RwLock::new(0),
            buffer: RwLock::new(Vec::new()),
            max_batch: DEFAULT_MAX_BATCH,
        }
    }

    /// Create a beacon delivering to a vendor endpoint
    pub fn with_endpoint(vendor: &'static str, endpoint: Url) -> Self {
        let mut beacon = Self::new(vendor);
        beacon.endpoint = Some(endpoint);
        beacon
    }

    /// Vendor this beacon reports to
    pub fn vendor(&self) -> &'static str {
        self.vendor
    }

    /// Emit a vendor report
    pub async fn emit<T: Serialize>(&self, body: &T) {
        let body = match serde_json::to_value(body) {
            Ok(body) => body,
            Err(error) => {
                warn!(vendor = self.vendor, %error, "Unserializable report dropped");
                return;
            }
        };

        let mut sequence = self.sequence.write().await;
        *sequence += 1;
        let record = BeaconRecord {
            id: Uuid::new_v4(),
            session_id: self.session_id,
            timestamp: Utc::now(),
            sequence: *sequence,
            vendor: self.vendor,
            body,
        };
        drop(sequence);

        debug!(vendor = self.vendor, seq = record.sequence, "Vendor report");

        let mut buffer = self.buffer.write().await;
        buffer.push(record);
        if buffer.len() >= self.max_batch {
            let batch: Vec<_> = buffer.drain(..).collect();
            drop(buffer);
            self.deliver(batch).await;
        }
    }

    /// Deliver everything currently buffered
    pub async fn flush(&self) {
        let batch: Vec<_> = self.buffer.write().await.drain(..).collect();
        self.deliver(batch).await;
    }

    /// Take the buffered records without delivering them
    pub async fn drain(&self) -> Vec<BeaconRecord> {
        self.buffer.write().await.drain(..).collect()
    }

    /// Buffered record count
    pub async fn buffered(&self) -> usize {
        self.buffer.read().await.len()
    }

    async fn deliver(&self, batch: Vec<BeaconRecord>) {
        if batch.is_empty() {
            return;
        }
        let Some(endpoint) = &self.endpoint else {
            debug!(vendor = self.vendor, count = batch.len(), "No endpoint; batch retained in memory only");
            return;
        };

        let result = self.http.post(endpoint.clone()).json(&batch).send().await;
        match result {
            Ok(response) if response.status().is_success() => {
                debug!(vendor = self.vendor, count = batch.len(), "Batch delivered");
            }
            Ok(response) => {
                warn!(
                    vendor = self.vendor,
                    status = response.status().as_u16(),
                    "Batch rejected; dropped"
                );
            }
            Err(error) => {
                warn!(vendor = self.vendor, %error, "Batch delivery failed; dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_emit_buffers_with_sequence() {
        let beacon = Beacon::new("testvendor");
        beacon.emit(&json!({"event": "play"})).await;
        beacon.emit(&json!({"event": "pause"})).await;

        let records = beacon.drain().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence, 1);
        assert_eq!(records[1].sequence, 2);
        assert_eq!(records[0].vendor, "testvendor");
        assert_eq!(records[0].body["event"], "play");
    }

    #[tokio::test]
    async fn test_drain_empties_buffer() {
        let beacon = Beacon::new("testvendor");
        beacon.emit(&json!({"event": "play"})).await;
        let _ = beacon.drain().await;
        assert_eq!(beacon.buffered().await, 0);
    }

    #[tokio::test]
    async fn test_flush_without_endpoint_drops_silently() {
        let beacon = Beacon::new("testvendor");
        beacon.emit(&json!({"event": "play"})).await;
        beacon.flush().await;
        assert_eq!(beacon.buffered().await, 0);
    }
}
