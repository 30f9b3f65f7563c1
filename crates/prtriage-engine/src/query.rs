//! Search query assembly.
//!
//! Queries are plain GitHub search strings. Building one never fails: a
//! malformed combination simply matches nothing on the remote side.

use std::fmt;

/// Label set when a pull request awaits QA.
pub const LABEL_WAITING_FOR_QA: &str = "waiting for QA";
/// Label set once QA has validated a pull request.
pub const LABEL_QA_OK: &str = "QA ✔️";
/// Label set when the author must act.
pub const LABEL_WAITING_FOR_AUTHOR: &str = "waiting for author";
/// Label set when a developer must act.
pub const LABEL_WAITING_FOR_DEV: &str = "waiting for dev";
/// Label set when product management must decide.
pub const LABEL_WAITING_FOR_PM: &str = "waiting for PM";
/// Label set when UX must review.
pub const LABEL_WAITING_FOR_UX: &str = "waiting for UX";
/// Label set when wording must be reviewed.
pub const LABEL_WAITING_FOR_WORDING: &str = "waiting for wording";
/// Label set when the pull request is blocked.
pub const LABEL_BLOCKED: &str = "blocked";

/// Labels that take a pull request out of the QA queue.
pub const NOT_READY_FOR_QA: [&str; 4] = [
    LABEL_WAITING_FOR_AUTHOR,
    LABEL_WAITING_FOR_DEV,
    LABEL_WAITING_FOR_PM,
    LABEL_BLOCKED,
];

/// Stored requests shared by several rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredRequest {
    /// Open pull requests that nobody else is waiting on.
    PrWaitingForReview,
    /// Open pull requests ready for QA.
    PrWaitingForQa,
}

impl StoredRequest {
    /// Apply this request's clauses to `query`.
    pub fn apply(self, query: SearchQuery) -> SearchQuery {
        match self {
            StoredRequest::PrWaitingForReview => query
                .open()
                .not_archived()
                .not_draft()
                .without_labels(&NOT_READY_FOR_QA[..3])
                .without_label(LABEL_WAITING_FOR_QA)
                .without_label(LABEL_QA_OK)
                .without_label(LABEL_BLOCKED),
            StoredRequest::PrWaitingForQa => query
                .open()
                .not_archived()
                .with_label(LABEL_WAITING_FOR_QA)
                .without_labels(&NOT_READY_FOR_QA),
        }
    }
}

/// Builder for a search query string.
///
/// # Examples
///
/// ```
/// use prtriage_engine::query::{SearchQuery, LABEL_BLOCKED, LABEL_WAITING_FOR_QA};
///
/// let q = SearchQuery::repo("PrestaShop", "PrestaShop")
///     .pull_requests()
///     .open()
///     .base("develop")
///     .with_label(LABEL_WAITING_FOR_QA)
///     .without_label(LABEL_BLOCKED)
///     .build();
/// assert_eq!(
///     q,
///     r#"repo:PrestaShop/PrestaShop is:pr is:open base:develop label:"waiting for QA" -label:"blocked""#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    clauses: Vec<String>,
}

impl SearchQuery {
    /// Scope to every repository of an organization.
    pub fn org(organization: &str) -> Self {
        Self::default().clause(format!("org:{organization}"))
    }

    /// Scope to one repository.
    pub fn repo(organization: &str, repository: &str) -> Self {
        Self::default().clause(format!("repo:{organization}/{repository}"))
    }

    /// Append a raw clause.
    pub fn clause(mut self, clause: impl Into<String>) -> Self {
        self.clauses.push(clause.into());
        self
    }

    /// Exclude one repository from an organization-wide scope.
    pub fn excluding_repo(self, organization: &str, repository: &str) -> Self {
        self.clause(format!("-repo:{organization}/{repository}"))
    }

    /// Only pull requests.
    pub fn pull_requests(self) -> Self {
        self.clause("is:pr")
    }

    /// Only open items.
    pub fn open(self) -> Self {
        self.clause("is:open")
    }

    /// Only merged pull requests.
    pub fn merged(self) -> Self {
        self.clause("is:merged")
    }

    /// Only pull requests merged after `date` (`YYYY-MM-DD`).
    pub fn merged_after(self, date: &str) -> Self {
        self.clause(format!("merged:>{date}"))
    }

    /// Skip archived repositories.
    pub fn not_archived(self) -> Self {
        self.clause("archived:false")
    }

    /// Skip draft pull requests.
    pub fn not_draft(self) -> Self {
        self.clause("-is:draft")
    }

    /// Oldest first.
    pub fn sort_created(self) -> Self {
        self.clause("sort:created")
    }

    /// Only pull requests targeting `branch`.
    pub fn base(self, branch: &str) -> Self {
        self.clause(format!("base:{branch}"))
    }

    /// Require `label`.
    pub fn with_label(self, label: &str) -> Self {
        self.clause(format!("label:\"{label}\""))
    }

    /// Reject `label`.
    pub fn without_label(self, label: &str) -> Self {
        self.clause(format!("-label:\"{label}\""))
    }

    /// Reject every label of `labels`.
    pub fn without_labels(self, labels: &[&str]) -> Self {
        labels
            .iter()
            .fold(self, |query, label| query.without_label(label))
    }

    /// Apply a stored request.
    pub fn request(self, request: StoredRequest) -> Self {
        request.apply(self)
    }

    /// Assemble the query string.
    pub fn build(&self) -> String {
        self.clauses.join(" ")
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

/// Browser URL of the search results for `query`.
///
/// # Examples
///
/// ```
/// use prtriage_engine::query::search_url;
///
/// let url = search_url("is:pr base:develop");
/// assert_eq!(url, "https://github.com/search?q=is%3Apr+base%3Adevelop");
/// ```
pub fn search_url(query: &str) -> String {
    reqwest::Url::parse_with_params("https://github.com/search", &[("q", query)])
        .map(|url| url.to_string())
        .unwrap_or_else(|_| "https://github.com/search".to_string())
}
