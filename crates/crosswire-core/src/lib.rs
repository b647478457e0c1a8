//! Crosswire Core - shared player abstraction for the connector suite
//!
//! This crate provides the vocabulary every connector speaks:
//! - Player event stream and the broadcast bus carrying it
//! - Source descriptions with vendor SSAI payloads
//! - The server-side ad model (breaks, ads, lifecycle states)
//! - The `AdController` seam into the host player's ad records
//! - Connector attach/detach lifecycle
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Host Player                              │
//! │        ┌──────────────┐              ┌──────────────┐           │
//! │        │  PlayerBus   │              │ AdController │           │
//! │        │  (events)    │              │ (ad records) │           │
//! │        └──────┬───────┘              └──────▲───────┘           │
//! └───────────────┼─────────────────────────────┼───────────────────┘
//!                 │ broadcast                   │ lifecycle calls
//!        ┌────────┴────────┬──────────────┬─────┴────────┐
//!        │                 │              │              │
//!  ┌─────┴──────┐   ┌──────┴─────┐  ┌─────┴──────┐  ┌────┴───────┐
//!  │   SSAI     │   │ Analytics  │  │   Media    │  │    ...     │
//!  │ connectors │   │ connectors │  │  session   │  │            │
//!  └────────────┘   └────────────┘  └────────────┘  └────────────┘
//! ```

pub mod ads;
pub mod connector;
pub mod error;
pub mod events;
pub mod source;
pub mod types;

pub use ads::{AdBreakInit, AdBreakState, AdController, AdInit, AdState};
pub use connector::Connector;
pub use error::{Error, Result};
pub use events::{PlayerBus, PlayerEvent};
pub use source::{SourceDescription, TypedSource};
pub use types::{AdBreakId, AdId, MetadataFrame, SessionId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the connector library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Crosswire Core initialized");
}
