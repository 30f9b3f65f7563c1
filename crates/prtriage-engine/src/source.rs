//! Collaborator seams: the code-hosting search, the chat platform and the
//! nightly report board. The engine only talks to these traits.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use prtriage_core::{LinkedIssue, PullRequest, TriageError};
use serde::{Deserialize, Serialize};

/// Read access to pull request metadata.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Every pull request matching a search query.
    async fn search(&self, query: &str) -> Result<Vec<PullRequest>, TriageError>;

    /// Number of results of a search query, without materializing them.
    async fn count(&self, query: &str) -> Result<u64, TriageError>;

    /// Issue `number` of the core repository.
    async fn issue(&self, number: u64) -> Result<LinkedIssue, TriageError>;

    /// Branch names of `repository` in the configured organization.
    async fn branches(&self, repository: &str) -> Result<Vec<String>, TriageError>;

    /// Raw content of `path` in `repository` at `reference`.
    async fn file_content(
        &self,
        repository: &str,
        path: &str,
        reference: &str,
    ) -> Result<String, TriageError>;
}

/// Delivery of one text block to one channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `text` to `channel`.
    async fn send(&self, channel: &str, text: &str) -> Result<(), TriageError>;
}

/// Test counts of a nightly run.
///
/// Each count is optional: the board omits counters it has no data for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightlyTests {
    /// Passed tests.
    pub passed: Option<u64>,
    /// Failed tests.
    pub failed: Option<u64>,
    /// Pending tests.
    pub pending: Option<u64>,
}

/// Parsed summary of one nightly report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightlyReport {
    /// Report identifier on the board.
    pub id: u64,
    /// Start of the run.
    pub start_date: DateTime<Utc>,
    /// End of the run.
    pub end_date: DateTime<Utc>,
    /// Test counts, absent when the run produced none.
    #[serde(default)]
    pub tests: Option<NightlyTests>,
}

impl NightlyReport {
    /// A run is green only when it reported failures and that count is zero.
    pub fn is_green(&self) -> bool {
        self.tests
            .as_ref()
            .and_then(|t| t.failed)
            .is_some_and(|failed| failed == 0)
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> chrono::Duration {
        self.end_date - self.start_date
    }
}

/// Read access to the nightly report board.
#[async_trait]
pub trait NightlyReports: Send + Sync {
    /// Report of `date` for `branch` and `campaign`, if one was published.
    async fn report(
        &self,
        date: NaiveDate,
        branch: &str,
        campaign: &str,
    ) -> Result<Option<NightlyReport>, TriageError>;
}
