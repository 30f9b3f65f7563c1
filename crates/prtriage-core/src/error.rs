use std::path::PathBuf;

/// Errors that can occur across the triage bot.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to a `miette` report at the boundary.
///
/// # Examples
///
/// ```
/// use prtriage_core::TriageError;
///
/// let err = TriageError::Config("missing Slack token".into());
/// assert!(err.to_string().contains("missing Slack token"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum TriageError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Code-hosting API failure (search, issue lookup, repository content).
    #[error("GitHub error: {0}")]
    GitHub(String),

    /// Chat platform API failure.
    #[error("Slack error: {0}")]
    Slack(String),

    /// Nightly report board failure.
    #[error("nightly board error: {0}")]
    Nightly(String),

    /// A filter definition that cannot be evaluated.
    #[error("invalid filter: {0}")]
    Filter(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
