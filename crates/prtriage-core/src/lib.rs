//! Core types, configuration, and error handling for the triage bot.
//!
//! This crate provides the shared foundation used by all other crates:
//! - [`TriageError`] — unified error type using `thiserror`
//! - [`TriageConfig`] — configuration loaded from `.prtriage.toml`
//! - Shared types: [`PullRequest`], [`LinkedIssue`], [`Priority`],
//!   [`Maintainer`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    GithubConfig, NamingConfig, NightlyConfig, QaConfig, SlackConfig, TeamConfig, TriageConfig,
};
pub use error::TriageError;
pub use types::{LinkedIssue, Maintainer, OutputFormat, Priority, PullRequest};

/// A convenience `Result` type for triage operations.
pub type Result<T> = std::result::Result<T, TriageError>;
