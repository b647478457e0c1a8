//! Source descriptions
//!
//! A source description is what the host player was asked to play. SSAI
//! connectors inspect the typed sources for a vendor payload, resolve the
//! real playback URL against the vendor backend, and hand back a rewritten
//! description.

use serde::{Deserialize, Serialize};
use url::Url;

/// Description of the content the player should play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescription {
    /// Candidate sources, in preference order
    pub sources: Vec<TypedSource>,
}

impl SourceDescription {
    /// Create a description with a single source
    pub fn single(source: TypedSource) -> Self {
        Self {
            sources: vec![source],
        }
    }

    /// First source carrying an SSAI payload for the given integration
    pub fn ssai_source(&self, integration: &str) -> Option<&TypedSource> {
        self.sources
            .iter()
            .find(|s| s.integration.as_deref() == Some(integration))
    }

    /// Replace the source at `index` with `source`, keeping order
    pub fn with_source_at(&self, index: usize, source: TypedSource) -> Self {
        let mut sources = self.sources.clone();
        if index < sources.len() {
            sources[index] = source;
        }
        Self { sources }
    }
}

/// A single playable source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedSource {
    /// Source URL
    pub src: Url,
    /// MIME type, if known (e.g. `application/x-mpegurl`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// SSAI integration claiming this source, e.g. `"uplynk"` or `"yospace"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration: Option<String>,
    /// Vendor-specific SSAI payload; each connector deserializes its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssai: Option<serde_json::Value>,
}

impl TypedSource {
    /// Create a plain source with no SSAI payload
    pub fn new(src: Url) -> Self {
        Self {
            src,
            content_type: None,
            integration: None,
            ssai: None,
        }
    }

    /// Set the MIME type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Attach an SSAI payload for the given integration
    pub fn with_ssai(mut self, integration: impl Into<String>, ssai: serde_json::Value) -> Self {
        self.integration = Some(integration.into());
        self.ssai = Some(ssai);
        self
    }

    /// Copy of this source pointing at a different URL, SSAI payload dropped
    ///
    /// Used by SSAI connectors after session resolution: the rewritten source
    /// must not be claimed again on the next source change.
    pub fn resolved(&self, src: Url) -> Self {
        Self {
            src,
            content_type: self.content_type.clone(),
            integration: None,
            ssai: None,
        }
    }
}
