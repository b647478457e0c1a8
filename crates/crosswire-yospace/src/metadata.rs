//! Yospace timed metadata
//!
//! Yospace-stitched streams carry ID3-shaped frames that anchor ad playback
//! to stream time:
//!
//! | Frame  | Meaning                                  |
//! |--------|------------------------------------------|
//! | `YMID` | Media ID of the advert                   |
//! | `YTYP` | Segment type: `S`tart, `M`id, `E`nd      |
//! | `YSEQ` | Segment sequence, `n:m`                  |
//! | `YDUR` | Advert duration in seconds               |
//! | `YPRG` | Programme ID (content, outside adverts)  |
//!
//! A metadata group without `YMID`/`YTYP` is not Yospace metadata and is
//! ignored by the connector.

use crosswire_core::{Error, MetadataFrame, Result};

/// Advert segment position signalled by `YTYP`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YospaceSegmentType {
    /// First segment of an advert
    Start,
    /// Continuation segment
    Mid,
    /// Final segment of an advert
    End,
}

impl YospaceSegmentType {
    fn parse(value: &str) -> Result<Self> {
        match value.trim() {
            "S" => Ok(YospaceSegmentType::Start),
            "M" => Ok(YospaceSegmentType::Mid),
            "E" => Ok(YospaceSegmentType::End),
            other => Err(Error::MalformedMetadata(format!(
                "unknown YTYP value '{other}'"
            ))),
        }
    }
}

/// One decoded group of Yospace frames
#[derive(Debug, Clone, PartialEq)]
pub struct YospaceMetadata {
    /// Advert media ID (`YMID`)
    pub media_id: String,
    /// Segment position within the advert (`YTYP`)
    pub segment_type: YospaceSegmentType,
    /// Segment number within the advert (`YSEQ`, left of the colon)
    pub sequence: u32,
    /// Total segments in the advert (`YSEQ`, right of the colon)
    pub sequence_count: u32,
    /// Advert duration in seconds (`YDUR`)
    pub duration: Option<f64>,
    /// Programme ID (`YPRG`)
    pub program_id: Option<String>,
    /// Stream time the group applies to
    pub time: f64,
}

impl YospaceMetadata {
    /// Decode a frame group; `Ok(None)` when the group is not Yospace's
    pub fn from_frames(frames: &[MetadataFrame]) -> Result<Option<Self>> {
        let find = |id: &str| frames.iter().find(|f| f.id == id);

        let (media_id, typ) = match (find("YMID"), find("YTYP")) {
            (Some(media), Some(typ)) => (media, typ),
            _ => return Ok(None),
        };

        let (sequence, sequence_count) = match find("YSEQ") {
            Some(frame) => parse_sequence(&frame.value)?,
            None => (1, 1),
        };

        let duration = match find("YDUR") {
            Some(frame) => Some(frame.value.trim().parse::<f64>().map_err(|_| {
                Error::MalformedMetadata(format!("unparseable YDUR '{}'", frame.value))
            })?),
            None => None,
        };

        Ok(Some(Self {
            media_id: media_id.value.clone(),
            segment_type: YospaceSegmentType::parse(&typ.value)?,
            sequence,
            sequence_count,
            duration,
            program_id: find("YPRG").map(|f| f.value.clone()),
            time: media_id.start_time,
        }))
    }

    /// Whether this group opens an advert
    pub fn is_advert_start(&self) -> bool {
        self.segment_type == YospaceSegmentType::Start && self.sequence == 1
    }

    /// Whether this group closes an advert
    pub fn is_advert_end(&self) -> bool {
        self.segment_type == YospaceSegmentType::End && self.sequence == self.sequence_count
    }
}

fn parse_sequence(value: &str) -> Result<(u32, u32)> {
    let (seq, count) = value
        .trim()
        .split_once(':')
        .ok_or_else(|| Error::MalformedMetadata(format!("unparseable YSEQ '{value}'")))?;
    let seq = seq
        .parse::<u32>()
        .map_err(|_| Error::MalformedMetadata(format!("unparseable YSEQ '{value}'")))?;
    let count = count
        .parse::<u32>()
        .map_err(|_| Error::MalformedMetadata(format!("unparseable YSEQ '{value}'")))?;
    Ok((seq, count))
}
