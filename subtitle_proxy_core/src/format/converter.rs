//! SRT <-> WebVTT conversion

use crate::format::SubtitleFormat;
use crate::format::timestamp::TimingLine;
use log::trace;
use std::borrow::Cow;

const VTT_HEADER: &str = "WEBVTT";

/// WebVTT block types that have no SubRip counterpart
const VTT_METADATA_BLOCKS: &[&str] = &["NOTE", "STYLE", "REGION"];

/// Strip a leading byte order mark and normalize line endings to LF
pub fn normalize(content: &str) -> Cow<'_, str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    if content.contains('\r') {
        Cow::Owned(content.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(content)
    }
}

/// Convert subtitle text between formats
///
/// Returns the input unchanged when `from == to`.
pub fn convert(content: &str, from: SubtitleFormat, to: SubtitleFormat) -> String {
    match (from, to) {
        (SubtitleFormat::Srt, SubtitleFormat::Vtt) => srt_to_vtt(content),
        (SubtitleFormat::Vtt, SubtitleFormat::Srt) => vtt_to_srt(content),
        _ => content.to_string(),
    }
}

fn srt_to_vtt(content: &str) -> String {
    let content = normalize(content);
    let mut out = String::with_capacity(content.len() + VTT_HEADER.len() + 2);
    out.push_str(VTT_HEADER);
    out.push_str("\n\n");

    let mut lines = content.split('\n').peekable();
    while let Some(line) = lines.next() {
        match TimingLine::parse(line) {
            Some(timing) => out.push_str(&timing.to_vtt()),
            None => {
                if line.contains("-->") {
                    trace!("Passing through malformed timing line: {line:?}");
                }
                out.push_str(line);
            }
        }
        if lines.peek().is_some() {
            out.push('\n');
        }
    }
    out
}

fn vtt_to_srt(content: &str) -> String {
    let content = normalize(content);
    let mut lines = content.split('\n').peekable();

    // Header block: the WEBVTT line and any header metadata, ending at the
    // first blank line or at a timing line that opens the first cue
    if lines
        .peek()
        .is_some_and(|first| first.starts_with(VTT_HEADER))
    {
        lines.next();
        while lines
            .next_if(|line| !line.trim().is_empty() && TimingLine::parse(line).is_none())
            .is_some()
        {}
        while lines.next_if(|line| line.trim().is_empty()).is_some() {}
    }

    let mut out: Vec<Cow<'_, str>> = Vec::new();
    let mut cue_number = 1u32;
    let mut block_len = 0usize;
    let mut skipping = false;

    for line in lines {
        if line.trim().is_empty() {
            block_len = 0;
            if skipping {
                // Drop the separator that closed a metadata block
                skipping = false;
            } else {
                out.push(Cow::Borrowed(line));
            }
            continue;
        }

        if skipping {
            continue;
        }

        if block_len == 0 && is_metadata_block(line) {
            skipping = true;
            continue;
        }

        match TimingLine::parse(line) {
            Some(timing) => {
                let number = Cow::Owned(cue_number.to_string());
                match block_len {
                    // Replace the cue identifier
                    1 => {
                        if let Some(last) = out.last_mut() {
                            *last = number;
                        }
                    }
                    0 => {
                        out.push(number);
                        block_len += 1;
                    }
                    // Cue follows the previous one without a separator
                    _ => {
                        out.push(Cow::Borrowed(""));
                        out.push(number);
                        block_len = 1;
                    }
                }
                out.push(Cow::Owned(timing.to_srt()));
                cue_number += 1;
            }
            None => out.push(Cow::Borrowed(line)),
        }
        block_len += 1;
    }

    out.join("\n")
}

fn is_metadata_block(line: &str) -> bool {
    VTT_METADATA_BLOCKS.iter().any(|keyword| {
        line.strip_prefix(keyword)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
    })
}

/// Guess the format of subtitle text
pub fn detect_format(content: &str) -> Option<SubtitleFormat> {
    let content = normalize(content);
    if content.trim_start().starts_with(VTT_HEADER) {
        return Some(SubtitleFormat::Vtt);
    }

    content
        .lines()
        .filter_map(TimingLine::parse)
        .map(|timing| match timing.separator {
            ',' => SubtitleFormat::Srt,
            _ => SubtitleFormat::Vtt,
        })
        .next()
}

/// Check that the text contains at least one comma-decimal timing line
pub fn validate_srt(content: &str) -> bool {
    normalize(content)
        .lines()
        .filter_map(TimingLine::parse)
        .any(|timing| timing.separator == ',')
}

/// Check for a `WEBVTT` header in the first lines and at least one timing line
pub fn validate_vtt(content: &str) -> bool {
    let content = normalize(content);
    let has_header = content
        .lines()
        .take(3)
        .any(|line| line.trim().starts_with(VTT_HEADER));
    let has_timing = content
        .lines()
        .filter_map(TimingLine::parse)
        .any(|timing| timing.separator == '.');
    has_header && has_timing
}
