//! Subtitle samples and response fragments

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use subtitle_proxy_core::protocol::Value;

/// Two-cue SubRip document
pub const SAMPLE_SRT: &str = "1\n00:00:01,000 --> 00:00:04,000\nNever let go, Jack.\n\n2\n00:00:05,500 --> 00:00:07,250\nI'll never let go.\nI promise.\n";

/// [`SAMPLE_SRT`] as WebVTT
pub const SAMPLE_VTT: &str = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:04.000\nNever let go, Jack.\n\n2\n00:00:05.500 --> 00:00:07.250\nI'll never let go.\nI promise.\n";

/// Gzip and base64 encode subtitle text the way `DownloadSubtitles` returns it
pub fn encode_payload(content: &str) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(content.as_bytes())
        .expect("writing to a Vec cannot fail");
    let compressed = encoder.finish().expect("writing to a Vec cannot fail");
    STANDARD.encode(compressed)
}

/// SubRip document with `count` numbered cues, two seconds apart
pub fn srt_with_cues(count: usize) -> String {
    (0..count)
        .map(|i| {
            let start = i as u64 * 2000;
            let end = start + 1500;
            format!(
                "{}\n{} --> {}\nLine number {}\n",
                i + 1,
                srt_time(start),
                srt_time(end),
                i + 1
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn srt_time(millis: u64) -> String {
    format!(
        "{:02}:{:02}:{:02},{:03}",
        millis / 3_600_000,
        millis / 60_000 % 60,
        millis / 1000 % 60,
        millis % 1000
    )
}

/// Response carrying only a status line
pub fn status(line: &str) -> Value {
    Value::structure([("status", Value::from(line))])
}

/// Successful response with a `data` array, or `data: false` when empty
pub fn data_response(records: Vec<Value>) -> Value {
    let data = if records.is_empty() {
        Value::Bool(false)
    } else {
        Value::Array(records)
    };
    Value::structure([("status", Value::from("200 OK")), ("data", data)])
}
