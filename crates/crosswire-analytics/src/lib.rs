//! Crosswire Analytics - vendor analytics connectors
//!
//! One module per vendor, one shared transport. Each connector subscribes to
//! the player bus, translates player/ad events into the vendor's report
//! shape, and delivers them through a [`Beacon`]: a buffered,
//! fire-and-forget JSON batch poster.
//!
//! - [`conviva`]: session lifecycle + playback state reporting
//! - [`comscore`]: streaming-tag state machine
//! - [`nielsen`]: DCR metadata + ID3 watermark forwarding
//! - [`gemius`]: program data + basic events with offsets
//! - [`adscript`]: content/ad metadata + play-state events
//!
//! Vendor SDK internals stay out of scope; the connector side - event
//! subscription, metadata mapping, state translation, transport - lives
//! here.

pub mod adscript;
pub mod beacon;
pub mod comscore;
pub mod conviva;
pub mod gemius;
pub mod nielsen;
pub mod vendor;

pub use adscript::{AdScriptAdapter, AdScriptMetadata};
pub use beacon::{Beacon, BeaconRecord};
pub use comscore::{ComscoreAdapter, ComscoreMetadata};
pub use conviva::{ConvivaAdapter, ConvivaMetadata};
pub use gemius::{GemiusAdapter, GemiusProgramData};
pub use nielsen::{NielsenAdapter, NielsenMetadata};
pub use vendor::{VendorAdapter, VendorConnector};
