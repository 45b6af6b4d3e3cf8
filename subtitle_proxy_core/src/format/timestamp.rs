//! Cue timestamps and timing lines

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<start>(?:\d+:)?\d{2}:\d{2}[,.]\d{3})(?P<arrow>[ \t]+-->[ \t]+)(?P<end>(?:\d+:)?\d{2}:\d{2}[,.]\d{3})(?P<rest>.*)$",
    )
    .unwrap()
});

static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<h>\d+):)?(?P<m>\d{2}):(?P<s>\d{2})(?P<sep>[,.])(?P<ms>\d{3})$").unwrap()
});

/// A cue timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub hours: u32,
    pub minutes: u8,
    pub seconds: u8,
    pub millis: u16,
}

impl Timestamp {
    /// Parse `HH:MM:SS,mmm`, `HH:MM:SS.mmm` or the short `MM:SS.mmm` form
    ///
    /// Minutes and seconds must be below 60.
    pub fn parse(s: &str) -> Option<Self> {
        let caps = TIMESTAMP_REGEX.captures(s)?;
        let hours = match caps.name("h") {
            Some(h) => h.as_str().parse().ok()?,
            None => 0,
        };
        let minutes: u8 = caps["m"].parse().ok()?;
        let seconds: u8 = caps["s"].parse().ok()?;
        let millis: u16 = caps["ms"].parse().ok()?;

        if minutes >= 60 || seconds >= 60 {
            return None;
        }

        Some(Self {
            hours,
            minutes,
            seconds,
            millis,
        })
    }

    pub fn from_millis(total: u64) -> Self {
        Self {
            hours: (total / 3_600_000) as u32,
            minutes: ((total / 60_000) % 60) as u8,
            seconds: ((total / 1000) % 60) as u8,
            millis: (total % 1000) as u16,
        }
    }

    pub fn as_millis(&self) -> u64 {
        u64::from(self.hours) * 3_600_000
            + u64::from(self.minutes) * 60_000
            + u64::from(self.seconds) * 1000
            + u64::from(self.millis)
    }

    /// SubRip rendering, `HH:MM:SS,mmm`
    pub fn to_srt(&self) -> String {
        self.render(',')
    }

    /// WebVTT rendering, `HH:MM:SS.mmm`
    pub fn to_vtt(&self) -> String {
        self.render('.')
    }

    fn render(&self, separator: char) -> String {
        format!(
            "{:02}:{:02}:{:02}{separator}{:03}",
            self.hours, self.minutes, self.seconds, self.millis
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_srt())
    }
}

/// A cue timing line split into its parts
///
/// The arrow (with its surrounding whitespace) and anything after the end
/// timestamp, such as WebVTT cue settings, are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingLine<'a> {
    pub start: Timestamp,
    pub end: Timestamp,
    pub arrow: &'a str,
    pub rest: &'a str,
    /// Decimal separator used by the source line
    pub separator: char,
}

impl<'a> TimingLine<'a> {
    /// Parse a timing line; `None` when the line is not a well-formed timing line
    pub fn parse(line: &'a str) -> Option<Self> {
        let caps = TIMING_REGEX.captures(line)?;
        let start_text = caps.name("start")?.as_str();
        let start = Timestamp::parse(start_text)?;
        let end = Timestamp::parse(caps.name("end")?.as_str())?;
        let separator = if start_text.contains(',') { ',' } else { '.' };

        Some(Self {
            start,
            end,
            arrow: caps.name("arrow")?.as_str(),
            rest: caps.name("rest")?.as_str(),
            separator,
        })
    }

    pub fn to_srt(&self) -> String {
        format!(
            "{}{}{}{}",
            self.start.to_srt(),
            self.arrow,
            self.end.to_srt(),
            self.rest
        )
    }

    pub fn to_vtt(&self) -> String {
        format!(
            "{}{}{}{}",
            self.start.to_vtt(),
            self.arrow,
            self.end.to_vtt(),
            self.rest
        )
    }
}
