use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pull request snapshot as returned by the code-hosting search.
///
/// Immutable for the duration of a run; rule-specific derived values
/// (priority, resolved milestone) are computed alongside it, never written
/// back into it.
///
/// # Examples
///
/// ```
/// use prtriage_core::PullRequest;
///
/// let pr = PullRequest::new("PrestaShop", 42, "Fix cart rules");
/// assert_eq!(pr.number, 42);
/// assert!(pr.milestone.is_none());
/// assert!(pr.approvals.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Repository name, without the organization prefix.
    pub repository: String,
    /// Whether the repository is private.
    #[serde(default)]
    pub repository_private: bool,
    /// Pull request number within the repository.
    pub number: u64,
    /// Browser URL of the pull request.
    pub url: String,
    /// Title line.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub body: String,
    /// Login of the author.
    pub author: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Milestone title, if any.
    pub milestone: Option<String>,
    /// Logins whose latest review approved the pull request, in review order.
    #[serde(default)]
    pub approvals: Vec<String>,
}

impl PullRequest {
    /// Build a minimal pull request; remaining fields take neutral values.
    pub fn new(repository: impl Into<String>, number: u64, title: impl Into<String>) -> Self {
        let repository = repository.into();
        Self {
            url: format!("https://github.com/{repository}/pull/{number}"),
            repository,
            repository_private: false,
            number,
            title: title.into(),
            body: String::new(),
            author: String::new(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            milestone: None,
            approvals: Vec::new(),
        }
    }

    /// `true` when `login` has already approved this pull request.
    pub fn is_approved_by(&self, login: &str) -> bool {
        self.approvals.iter().any(|a| a == login)
    }

    /// `repository#number`, the short reference used in messages.
    ///
    /// # Examples
    ///
    /// ```
    /// use prtriage_core::PullRequest;
    ///
    /// assert_eq!(PullRequest::new("ps_banner", 7, "x").reference(), "ps_banner#7");
    /// ```
    pub fn reference(&self) -> String {
        format!("{}#{}", self.repository, self.number)
    }
}

/// The issue a pull request claims to fix.
///
/// # Examples
///
/// ```
/// use prtriage_core::{LinkedIssue, Priority};
///
/// let issue = LinkedIssue::new(1234).with_label("Must-have");
/// assert_eq!(issue.priority(), Priority::MustHave);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedIssue {
    /// Issue number in the core repository.
    pub number: u64,
    /// Browser URL of the issue.
    pub url: String,
    /// Milestone title, if any.
    pub milestone: Option<String>,
    /// Label names.
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl LinkedIssue {
    /// Build an unlabelled issue with no milestone.
    pub fn new(number: u64) -> Self {
        Self {
            number,
            url: String::new(),
            milestone: None,
            labels: BTreeSet::new(),
        }
    }

    /// Add a label, builder style.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    /// Priority contributed by this issue's labels.
    pub fn priority(&self) -> Priority {
        Priority::from_labels(self.labels.iter().map(String::as_str))
    }
}

/// Test priority of a pull request, taken from its linked issue's labels.
///
/// Ordered so that `MustHave > NiceToHave > None`.
///
/// # Examples
///
/// ```
/// use prtriage_core::Priority;
///
/// assert_eq!(Priority::from_labels(["Nice-to-have", "Must-have"]), Priority::MustHave);
/// assert_eq!(Priority::from_labels(["Must-have", "Nice-to-have"]), Priority::MustHave);
/// assert_eq!(Priority::from_labels(["Bug"]), Priority::None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// No priority label.
    #[default]
    None,
    /// Labelled `Nice-to-have`.
    NiceToHave,
    /// Labelled `Must-have`.
    MustHave,
}

impl Priority {
    /// Label carrying [`Priority::MustHave`].
    pub const MUST_HAVE_LABEL: &'static str = "Must-have";
    /// Label carrying [`Priority::NiceToHave`].
    pub const NICE_TO_HAVE_LABEL: &'static str = "Nice-to-have";

    /// Highest priority among `labels`. Enumeration order is irrelevant.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        labels
            .into_iter()
            .map(|label| match label {
                Self::MUST_HAVE_LABEL => Priority::MustHave,
                Self::NICE_TO_HAVE_LABEL => Priority::NiceToHave,
                _ => Priority::None,
            })
            .max()
            .unwrap_or_default()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::MustHave => write!(f, "Must Have"),
            Priority::NiceToHave => write!(f, "Nice-to-have"),
            Priority::None => write!(f, "none"),
        }
    }
}

/// A maintainer: GitHub login paired with the Slack member id used both
/// for mentions and as their private notification channel.
///
/// # Examples
///
/// ```
/// use prtriage_core::Maintainer;
///
/// let m = Maintainer::new("alice", "U01");
/// assert_eq!(m.mention(), "<@U01>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Maintainer {
    /// GitHub login.
    pub github: String,
    /// Slack member id.
    pub slack: String,
}

impl Maintainer {
    /// Pair a GitHub login with a Slack member id.
    pub fn new(github: impl Into<String>, slack: impl Into<String>) -> Self {
        Self {
            github: github.into(),
            slack: slack.into(),
        }
    }

    /// Slack mention markup for this maintainer.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.slack)
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use prtriage_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and messages.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
