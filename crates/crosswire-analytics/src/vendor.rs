//! Vendor adapter seam
//!
//! A vendor module is a pure state machine over [`PlayerEvent`]s; the
//! [`VendorConnector`] owns the bus subscription loop around it. Keeping the
//! adapters synchronous-testable and the plumbing generic means every vendor
//! gets the same lifecycle for free.

use async_trait::async_trait;
use crosswire_core::{Connector, PlayerBus, PlayerEvent};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Translates player events into one vendor's reports
#[async_trait]
pub trait VendorAdapter: Send + 'static {
    /// Stable vendor name
    fn vendor(&self) -> &'static str;

    /// Handle one player event
    async fn handle_event(&mut self, event: &PlayerEvent);

    /// The session is over; emit whatever closes the vendor session
    async fn finish(&mut self) {}
}

/// Bus subscription loop around a [`VendorAdapter`]
pub struct VendorConnector {
    name: &'static str,
    worker: Option<JoinHandle<()>>,
}

impl VendorConnector {
    /// Subscribe the adapter to the bus and start forwarding
    pub fn spawn<A: VendorAdapter>(mut adapter: A, bus: &PlayerBus) -> Self {
        let name = adapter.vendor();
        let mut events = bus.subscribe();
        let worker = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => adapter.handle_event(&event).await,
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(vendor = adapter.vendor(), "Player bus closed");
                        adapter.finish().await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(vendor = adapter.vendor(), skipped, "Adapter lagged behind the bus");
                    }
                }
            }
        });
        Self {
            name,
            worker: Some(worker),
        }
    }
}

#[async_trait]
impl Connector for VendorConnector {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn detach(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

impl Drop for VendorConnector {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl VendorAdapter for Counter {
        fn vendor(&self) -> &'static str {
            "counter"
        }

        async fn handle_event(&mut self, _event: &PlayerEvent) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_connector_forwards_events() {
        let bus = PlayerBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let mut connector = VendorConnector::spawn(Counter { seen: seen.clone() }, &bus);

        bus.publish(PlayerEvent::Play);
        bus.publish(PlayerEvent::TimeUpdate { current_time: 1.0 });

        // Give the worker a turn of the executor
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(connector.name(), "counter");
        connector.detach().await;
    }
}
