//! Connector lifecycle

use async_trait::async_trait;

/// Lifecycle contract shared by every connector
///
/// Construction and activation differ per connector (SSAI connectors also
/// intercept the source; analytics connectors only subscribe), so those stay
/// on the concrete types. Detaching is uniform: stop background work and
/// release the bus subscription.
#[async_trait]
pub trait Connector: Send {
    /// Stable connector name, used in logs and vendor reports
    fn name(&self) -> &'static str;

    /// Detach from the player and stop all background work
    ///
    /// Idempotent: detaching twice is a no-op.
    async fn detach(&mut self);
}
