//! Search results and download links

use crate::format::SubtitleFormat;
use crate::protocol::Value;
use serde::{Deserialize, Serialize};

/// One subtitle file returned by a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleResult {
    pub file_id: String,
    pub language: String,
    pub download_url: String,
    pub format: SubtitleFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    pub release: Option<String>,
    pub movie_name: Option<String>,
    pub year: Option<u32>,
    pub imdb_id: Option<String>,
    pub hearing_impaired: bool,
    pub download_count: u64,
    pub rating: Option<f64>,
    pub file_size: Option<u64>,
    pub encoding: Option<String>,
}

impl SubtitleResult {
    /// Map a `SearchSubtitles` record
    ///
    /// Records without a file id are skipped. `download_url` is left to
    /// the caller, which knows how links are published.
    pub(crate) fn from_record(record: &Value, format: SubtitleFormat) -> Option<Self> {
        let file_id = record.get_str("IDSubtitleFile")?.to_string();
        let text = |name: &str| record.get_str(name).map(str::to_string);

        Some(Self {
            file_id,
            language: text("SubLanguageID").unwrap_or_default(),
            download_url: String::new(),
            format,
            raw_content: None,
            release: text("SubFileName"),
            movie_name: text("MovieName"),
            year: record
                .get("MovieYear")
                .and_then(Value::as_i64)
                .and_then(|year| u32::try_from(year).ok()),
            imdb_id: text("IDMovieImdb"),
            hearing_impaired: record
                .get("SubHearingImpaired")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            download_count: record
                .get("SubDownloadsCnt")
                .and_then(Value::as_i64)
                .and_then(|count| u64::try_from(count).ok())
                .unwrap_or(0),
            rating: record
                .get("SubRating")
                .and_then(Value::as_f64)
                .filter(|rating| *rating > 0.0),
            file_size: record
                .get("SubSize")
                .and_then(Value::as_i64)
                .and_then(|size| u64::try_from(size).ok()),
            encoding: text("SubEncoding"),
        })
    }
}

/// Link to decompressed subtitle content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub file_id: String,
    pub url: String,
    pub file_name: String,
    pub format: SubtitleFormat,
}

impl DownloadLink {
    /// File name offered for `file_id` in `format`
    pub fn file_name_for(file_id: &str, format: SubtitleFormat) -> String {
        format!("subtitle_{file_id}.{}", format.extension())
    }
}
