//! Subtitle text formats and conversion between them
//!
//! Conversion is line based: timing lines are rewritten, everything else is
//! carried through byte for byte. Nothing in this module fails on malformed
//! input; lines that cannot be understood are passed through unchanged.

mod converter;
mod remote;
mod timestamp;

pub use converter::{convert, detect_format, normalize, validate_srt, validate_vtt};
pub use remote::{ContentFetcher, FetchError, HttpFetcher, convert_url, to_data_url};
pub use timestamp::{TimingLine, Timestamp};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported subtitle formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// SubRip
    Srt,
    /// WebVTT
    Vtt,
}

impl SubtitleFormat {
    /// All supported formats
    pub const ALL: [SubtitleFormat; 2] = [SubtitleFormat::Srt, SubtitleFormat::Vtt];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
        }
    }

    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "application/x-subrip",
            SubtitleFormat::Vtt => "text/vtt",
        }
    }

    /// Guess the format from a file name or path
    pub fn from_path(path: &str) -> Option<Self> {
        let (_, ext) = path.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown format name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported subtitle format: {0} (expected srt or vtt)")]
pub struct UnsupportedFormat(pub String);

impl FromStr for SubtitleFormat {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "srt" | "subrip" => Ok(SubtitleFormat::Srt),
            "vtt" | "webvtt" => Ok(SubtitleFormat::Vtt),
            _ => Err(UnsupportedFormat(s.to_string())),
        }
    }
}
