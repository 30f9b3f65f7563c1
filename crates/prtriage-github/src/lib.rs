//! GitHub access for the triage engine.
//!
//! [`GitHubClient`] implements
//! [`PullRequestSource`](prtriage_engine::source::PullRequestSource) on top
//! of `octocrab`.

mod client;

pub use client::GitHubClient;
