//! Yospace SSAI source configuration

use serde::{Deserialize, Serialize};

/// How the Yospace session treats the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YospaceStreamType {
    /// Live linear stream
    #[default]
    Live,
    /// Live stream with pause/timeshift support
    LivePause,
    /// Video on demand
    Vod,
}

impl YospaceStreamType {
    pub fn is_live(&self) -> bool {
        matches!(self, YospaceStreamType::Live | YospaceStreamType::LivePause)
    }
}

/// SSAI payload carried by a typed source claimed by the Yospace connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YospaceSsaiDescription {
    /// Stream class of the session
    pub stream_type: YospaceStreamType,
}

impl YospaceSsaiDescription {
    pub fn new(stream_type: YospaceStreamType) -> Self {
        Self { stream_type }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_type_live() {
        assert!(YospaceStreamType::Live.is_live());
        assert!(YospaceStreamType::LivePause.is_live());
        assert!(!YospaceStreamType::Vod.is_live());
    }

    #[test]
    fn test_description_from_json() {
        let desc: YospaceSsaiDescription =
            serde_json::from_str(r#"{"streamType": "livepause"}"#).unwrap();
        assert_eq!(desc.stream_type, YospaceStreamType::LivePause);

        let desc: YospaceSsaiDescription = serde_json::from_str("{}").unwrap();
        assert_eq!(desc.stream_type, YospaceStreamType::Live);
    }
}
