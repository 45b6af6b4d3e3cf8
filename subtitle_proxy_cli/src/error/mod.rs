use colored::*;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use subtitle_proxy_core::{Error as CoreError, ServiceError};

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    /// Source error if any
    source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Error categories that map to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    Upstream,
    Filesystem,
    Authentication,
    NotFound,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    UpstreamUnavailable = 3,
    FilesystemError = 4,
    AuthenticationFailed = 5,
    NotFound = 6,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
}

impl CliError {
    fn new(category: ErrorCategory, message: &str) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Create a general error
    pub fn general(message: &str) -> Self {
        Self::new(ErrorCategory::General, message)
    }

    /// Create a command misuse error
    pub fn misuse(message: &str) -> Self {
        Self::new(ErrorCategory::Misuse, message)
            .with_suggestion("Run 'subproxy --help' for usage information")
    }

    /// Create an error for an unreachable or failing remote
    pub fn upstream(message: &str) -> Self {
        Self::new(ErrorCategory::Upstream, message)
            .with_suggestion("Check your internet connection")
            .with_suggestion("Try again later")
    }

    /// Create an error for rejected credentials
    pub fn authentication(message: &str) -> Self {
        Self::new(ErrorCategory::Authentication, message)
            .with_suggestion("Check remote.username and remote.password with 'subproxy config list'")
            .with_suggestion("Credentials can also be set with OPENSUBTITLES_USERNAME and OPENSUBTITLES_PASSWORD")
    }

    /// Create an error for data the remote does not have
    pub fn not_found(message: &str) -> Self {
        Self::new(ErrorCategory::NotFound, message)
    }

    /// Create a filesystem error
    pub fn filesystem(message: &str) -> Self {
        let mut error = Self::new(ErrorCategory::Filesystem, message);

        if message.contains("not found") || message.contains("No such file") {
            error
                .suggestions
                .push("Check if the file or directory exists".to_string());
        } else if message.contains("permission") || message.contains("denied") {
            error.suggestions.push("Check file permissions".to_string());
        }

        error
    }

    /// Create an error from an IO error
    pub fn from_io_error(error: io::Error, path: &str) -> Self {
        let message = format!("IO error on '{path}': {error}");
        let mut cli_error = match error.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                Self::filesystem(&message)
            }
            _ => Self::general(&message),
        };

        cli_error.source = Some(Box::new(error));
        cli_error
            .context
            .push(("path".to_string(), path.to_string()));
        cli_error
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::Upstream => ExitCode::UpstreamUnavailable,
            ErrorCategory::Filesystem => ExitCode::FilesystemError,
            ErrorCategory::Authentication => ExitCode::AuthenticationFailed,
            ErrorCategory::NotFound => ExitCode::NotFound,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::Upstream => "Upstream Error",
            ErrorCategory::Filesystem => "File Error",
            ErrorCategory::Authentication => "Authentication Error",
            ErrorCategory::NotFound => "Not Found",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse | ErrorCategory::NotFound => self.label().yellow(),
            _ => self.label().red(),
        };
        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        // Error chain in debug mode
        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }
}

impl From<ServiceError> for CliError {
    fn from(error: ServiceError) -> Self {
        let message = error.to_string();
        let mut cli_error = match &error {
            ServiceError::AuthenticationFailed { .. } => Self::authentication(&message),
            ServiceError::UpstreamUnavailable { .. } => Self::upstream(&message),
            ServiceError::NotFound { .. } => Self::not_found(&message),
        };
        cli_error.source = Some(Box::new(error));
        cli_error
    }
}

/// Convert anyhow errors to CLI errors, keeping the category of a service error
/// anywhere in the chain
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<CliError>() {
            Ok(cli_error) => return cli_error,
            Err(error) => error,
        };

        let service_error = error.chain().find_map(|cause| {
            cause
                .downcast_ref::<ServiceError>()
                .cloned()
                .or_else(|| {
                    cause
                        .downcast_ref::<CoreError>()
                        .and_then(CoreError::as_service_error)
                        .cloned()
                })
        });

        let message = format!("{error:#}");
        let mut cli_error = match service_error {
            Some(ServiceError::AuthenticationFailed { .. }) => Self::authentication(&message),
            Some(ServiceError::UpstreamUnavailable { .. }) => Self::upstream(&message),
            Some(ServiceError::NotFound { .. }) => Self::not_found(&message),
            None => match error.chain().find_map(|cause| cause.downcast_ref::<io::Error>()) {
                Some(io_error) if matches!(
                    io_error.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) => Self::filesystem(&message),
                _ => Self::general(&message),
            },
        };
        cli_error.source = Some(error.into());
        cli_error
    }
}
