//! Error types for Crosswire connectors

use thiserror::Error;

/// Result type alias for connector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Connector error types
#[derive(Error, Debug)]
pub enum Error {
    // Session errors
    #[error("Failed to create ad session: {0}")]
    SessionInit(String),

    #[error("Preplay request failed: {0}")]
    Preplay(String),

    #[error("Ping request failed: {0}")]
    Ping(String),

    #[error("Asset info request failed: {asset}")]
    AssetInfo { asset: String },

    // Source errors
    #[error("Source carries no SSAI description for integration '{integration}'")]
    MissingSsaiDescription { integration: &'static str },

    #[error("Invalid SSAI description: {0}")]
    InvalidSsaiDescription(String),

    // Vendor delivery errors
    #[error("Beacon delivery failed: {0}")]
    BeaconDelivery(String),

    // Metadata errors
    #[error("Malformed timed metadata: {0}")]
    MalformedMetadata(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response status {status} from {url}")]
    ResponseStatus { status: u16, url: String },

    #[error("Malformed response body: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if this error is recoverable
    ///
    /// Recoverable errors leave playback running; the connector retries or
    /// degrades. Unrecoverable errors are surfaced through the ad controller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Ping(_)
                | Error::AssetInfo { .. }
                | Error::BeaconDelivery(_)
                | Error::MalformedMetadata(_)
                | Error::Network(_)
        )
    }

    /// Returns the error code for vendor reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::SessionInit(_) => "SESSION_INIT",
            Error::Preplay(_) => "PREPLAY",
            Error::Ping(_) => "PING",
            Error::AssetInfo { .. } => "ASSET_INFO",
            Error::MissingSsaiDescription { .. } => "MISSING_SSAI",
            Error::InvalidSsaiDescription(_) => "INVALID_SSAI",
            Error::BeaconDelivery(_) => "BEACON_DELIVERY",
            Error::MalformedMetadata(_) => "MALFORMED_METADATA",
            Error::Network(_) => "NETWORK",
            Error::ResponseStatus { .. } => "RESPONSE_STATUS",
            Error::MalformedResponse(_) => "MALFORMED_RESPONSE",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Internal(_) => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::Ping("timeout".into()).is_recoverable());
        assert!(Error::BeaconDelivery("503".into()).is_recoverable());
        assert!(!Error::Preplay("bad asset".into()).is_recoverable());
        assert!(!Error::InvalidConfig("empty asset list".into()).is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::SessionInit("x".into()).error_code(), "SESSION_INIT");
        assert_eq!(
            Error::MissingSsaiDescription {
                integration: "uplynk"
            }
            .error_code(),
            "MISSING_SSAI"
        );
    }
}
