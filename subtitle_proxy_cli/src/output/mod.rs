mod formatters;

pub use formatters::{JsonFormatter, TextFormatter};

use crate::terminal;
use anyhow::Result;
use std::collections::BTreeMap;
use subtitle_proxy_core::{DownloadLink, ServiceStatus, SubtitleResult};

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// JSON when forced or when stdout is not a terminal, text otherwise
    pub fn detect(force_json: bool) -> Self {
        if force_json || !terminal::is_interactive() {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Format search results
    fn format_results(&self, results: &[SubtitleResult]) -> Result<String>;

    /// Format a download link
    fn format_link(&self, link: &DownloadLink) -> Result<String>;

    /// Format the local status report
    fn format_status(&self, status: &ServiceStatus) -> Result<String>;

    /// Format the remote `ServerInfo` members
    fn format_server_info(&self, info: &BTreeMap<String, String>) -> Result<String>;
}

/// Create a formatter based on output format
pub fn create_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(terminal::supports_ansi())),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
