//! Terminal detection and capability utilities

use is_terminal::IsTerminal;
use std::env;
use std::io::stdout;

/// Check if stdout is connected to an interactive terminal
pub fn is_interactive() -> bool {
    if !stdout().is_terminal() {
        return false;
    }

    // CI runners may allocate a TTY without anyone reading it
    if is_ci_environment() {
        return false;
    }

    true
}

/// Check if the terminal supports ANSI escape codes for colors
pub fn supports_ansi() -> bool {
    if !is_interactive() {
        return false;
    }

    if env::var_os("NO_COLOR").is_some() {
        return false;
    }

    let term = env::var("TERM").unwrap_or_default();
    if cfg!(windows) {
        term != "dumb"
    } else {
        !(term == "dumb" || term.is_empty())
    }
}

/// Detect if running in a CI environment
fn is_ci_environment() -> bool {
    let ci_vars = [
        "CI",
        "CONTINUOUS_INTEGRATION",
        "JENKINS_URL",
        "GITHUB_ACTIONS",
        "GITLAB_CI",
        "BUILDKITE",
        "TF_BUILD", // Azure DevOps
    ];

    ci_vars.iter().any(|var| env::var_os(var).is_some())
}

/// Create an ANSI terminal hyperlink
///
/// Format: `\x1b]8;;{url}\x1b\\{display_text}\x1b]8;;\x1b\\`
/// Without ANSI support, returns the display text followed by the URL.
pub fn hyperlink(url: &str, display_text: &str) -> String {
    if supports_ansi() {
        format!("\x1b]8;;{url}\x1b\\{display_text}\x1b]8;;\x1b\\")
    } else {
        format!("{display_text} ({url})")
    }
}
