use super::OutputFormatter;
use crate::terminal;
use anyhow::Result;
use colored::*;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use subtitle_proxy_core::{DownloadLink, ServiceStatus, SubtitleResult};

/// Format a byte count with a binary unit suffix
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    use_color: bool,
}

impl TextFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, text: &str, color: fn(&str) -> ColoredString) -> String {
        if self.use_color {
            color(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn link(&self, url: &str, text: &str) -> String {
        if self.use_color {
            terminal::hyperlink(url, text)
        } else {
            url.to_string()
        }
    }

    fn format_result(&self, index: usize, result: &SubtitleResult) -> String {
        let mut output = String::new();

        let title = match (&result.movie_name, result.year) {
            (Some(name), Some(year)) => format!("{name} ({year})"),
            (Some(name), None) => name.clone(),
            _ => format!("File {}", result.file_id),
        };
        output.push_str(&format!(
            "{:>3}. {} [{}]\n",
            index + 1,
            self.colorize(&title, |s| s.bold()),
            self.colorize(&result.language, |s| s.yellow())
        ));

        output.push_str(&format!("     File ID: {}\n", result.file_id));
        if let Some(release) = &result.release {
            output.push_str(&format!("     Release: {release}\n"));
        }
        if let Some(imdb_id) = &result.imdb_id {
            output.push_str(&format!("     IMDb: {imdb_id}\n"));
        }

        let mut details = vec![
            format!("format {}", result.format),
            format!("{} downloads", result.download_count),
        ];
        if let Some(rating) = result.rating {
            details.push(format!("rated {rating:.1}"));
        }
        if let Some(size) = result.file_size {
            details.push(format_bytes(size));
        }
        if result.hearing_impaired {
            details.push("hearing impaired".to_string());
        }
        output.push_str(&format!("     {}\n", details.join(", ")));

        output.push_str(&format!(
            "     {}\n",
            self.colorize(&self.link(&result.download_url, &result.download_url), |s| {
                s.cyan()
            })
        ));

        if let Some(content) = &result.raw_content {
            output.push_str(&format!(
                "     Content: {} cues inline\n",
                content.matches("-->").count()
            ));
        }

        output
    }
}

impl OutputFormatter for TextFormatter {
    fn format_results(&self, results: &[SubtitleResult]) -> Result<String> {
        if results.is_empty() {
            return Ok(self.colorize("No subtitles found", |s| s.yellow()) + "\n");
        }

        let mut output = String::new();
        for (index, result) in results.iter().enumerate() {
            if index > 0 {
                output.push('\n');
            }
            output.push_str(&self.format_result(index, result));
        }
        output.push_str(&format!(
            "\n{} result{}\n",
            results.len(),
            if results.len() == 1 { "" } else { "s" }
        ));
        Ok(output)
    }

    fn format_link(&self, link: &DownloadLink) -> Result<String> {
        let mut output = String::new();
        output.push_str(&format!(
            "{} {}\n",
            self.colorize("File:", |s| s.bold()),
            link.file_name
        ));
        output.push_str(&format!(
            "{} {}\n",
            self.colorize("Format:", |s| s.bold()),
            link.format
        ));

        // Data URLs are long; print them whole so they can be copied
        let url = if link.url.starts_with("data:") {
            link.url.clone()
        } else {
            self.link(&link.url, &link.url)
        };
        output.push_str(&format!("{} {}\n", self.colorize("URL:", |s| s.bold()), url));
        Ok(output)
    }

    fn format_status(&self, status: &ServiceStatus) -> Result<String> {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n",
            self.colorize(&format!("subproxy {}", status.version), |s| s.bold())
        ));
        output.push_str(&format!("  Endpoint: {}\n", status.endpoint));
        output.push_str(&format!(
            "  Credentials: {}\n",
            if status.credentials_configured {
                self.colorize("configured", |s| s.green())
            } else {
                self.colorize("anonymous", |s| s.yellow())
            }
        ));

        output.push_str(&format!("\n{}\n", self.colorize("Session", |s| s.bold())));
        let state = if status.session.authenticated {
            self.colorize(status.session.state, |s| s.green())
        } else {
            self.colorize(status.session.state, |s| s.yellow())
        };
        output.push_str(&format!("  State: {state}\n"));
        if let Some(username) = &status.session.username {
            output.push_str(&format!("  User: {username}\n"));
        }
        if let Some(age) = status.session.age_secs {
            output.push_str(&format!("  Age: {age}s\n"));
        }

        let cache = &status.cache;
        output.push_str(&format!("\n{}\n", self.colorize("Cache", |s| s.bold())));
        output.push_str(&format!(
            "  Entries: {} ({} active, {} expired)\n",
            cache.entry_count, cache.active_entries, cache.expired_entries
        ));
        output.push_str(&format!(
            "  Hits: {} / Misses: {} ({:.1}%)\n",
            cache.hit_count,
            cache.miss_count,
            cache.hit_rate() * 100.0
        ));

        let formats: Vec<String> = status
            .supported_formats
            .iter()
            .map(ToString::to_string)
            .collect();
        output.push_str(&format!("\nFormats: {}\n", formats.join(", ")));
        output.push_str(&format!(
            "Checked at: {}\n",
            status.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        Ok(output)
    }

    fn format_server_info(&self, info: &BTreeMap<String, String>) -> Result<String> {
        let width = info.keys().map(String::len).max().unwrap_or(0);
        let mut output = String::new();
        for (key, value) in info {
            output.push_str(&format!(
                "  {}: {}\n",
                self.colorize(&format!("{key:<width$}"), |s| s.cyan()),
                value
            ));
        }
        Ok(output)
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let mut rendered = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        rendered.push('\n');
        Ok(rendered)
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_results(&self, results: &[SubtitleResult]) -> Result<String> {
        self.render(&json!({
            "count": results.len(),
            "results": results,
        }))
    }

    fn format_link(&self, link: &DownloadLink) -> Result<String> {
        self.render(link)
    }

    fn format_status(&self, status: &ServiceStatus) -> Result<String> {
        self.render(status)
    }

    fn format_server_info(&self, info: &BTreeMap<String, String>) -> Result<String> {
        self.render(info)
    }
}
