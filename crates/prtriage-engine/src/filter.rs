//! Declarative pull request filtering.
//!
//! A [`FilterSet`] is a conjunction of [`Filter`]s. Each filter reads one
//! attribute of a [`PullRequest`] and tests it for membership in a value set,
//! optionally negated. Definitions are validated when they are built, so
//! evaluation itself never fails.

use std::fmt;
use std::str::FromStr;

use prtriage_core::{PullRequest, TriageError};

/// The attribute a [`Filter`] inspects.
///
/// # Examples
///
/// ```
/// use prtriage_engine::filter::FilterKind;
///
/// let kind: FilterKind = "num_approved".parse().unwrap();
/// assert_eq!(kind, FilterKind::NumApproved);
/// assert!("label".parse::<FilterKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Repository name, in-set.
    RepositoryName,
    /// Repository privacy flag, equality.
    RepositoryPrivate,
    /// Number of approving reviews, equality.
    NumApproved,
    /// Author login, in-set.
    Author,
    /// Milestone title, in-set. Absent milestones never match.
    Milestone,
}

impl FilterKind {
    /// Equality kinds compare against exactly one value.
    pub fn is_equality(self) -> bool {
        matches!(self, FilterKind::RepositoryPrivate | FilterKind::NumApproved)
    }

    fn attribute(self, pr: &PullRequest) -> Option<String> {
        match self {
            FilterKind::RepositoryName => Some(pr.repository.clone()),
            FilterKind::RepositoryPrivate => Some(pr.repository_private.to_string()),
            FilterKind::NumApproved => Some(pr.approvals.len().to_string()),
            FilterKind::Author => Some(pr.author.clone()).filter(|a| !a.is_empty()),
            FilterKind::Milestone => pr.milestone.clone(),
        }
    }

    fn validate(self, value: &str) -> Result<(), TriageError> {
        match self {
            FilterKind::RepositoryPrivate => value.parse::<bool>().map(|_| ()).map_err(|_| {
                TriageError::Filter(format!("{self} expects true or false, got '{value}'"))
            }),
            FilterKind::NumApproved => value.parse::<usize>().map(|_| ()).map_err(|_| {
                TriageError::Filter(format!("{self} expects a count, got '{value}'"))
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::RepositoryName => write!(f, "repository_name"),
            FilterKind::RepositoryPrivate => write!(f, "repository_private"),
            FilterKind::NumApproved => write!(f, "num_approved"),
            FilterKind::Author => write!(f, "author"),
            FilterKind::Milestone => write!(f, "milestone"),
        }
    }
}

impl FromStr for FilterKind {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "repository_name" => Ok(FilterKind::RepositoryName),
            "repository_private" => Ok(FilterKind::RepositoryPrivate),
            "num_approved" => Ok(FilterKind::NumApproved),
            "author" => Ok(FilterKind::Author),
            "milestone" => Ok(FilterKind::Milestone),
            other => Err(TriageError::Filter(format!("unknown filter kind '{other}'"))),
        }
    }
}

/// A single predicate: `attribute ∈ values`, or `∉` when negated.
///
/// An empty value set places no constraint on the attribute, negated or not.
///
/// # Examples
///
/// ```
/// use prtriage_core::PullRequest;
/// use prtriage_engine::filter::{Filter, FilterKind};
///
/// let specs = Filter::new(FilterKind::RepositoryName, ["prestashop-specs"], true).unwrap();
/// assert!(specs.matches(&PullRequest::new("PrestaShop", 1, "Fix")));
/// assert!(!specs.matches(&PullRequest::new("prestashop-specs", 2, "Spec")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    kind: FilterKind,
    values: Vec<String>,
    negate: bool,
}

impl Filter {
    /// Build a filter, validating the values against the kind.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Filter`] when an equality kind is given more than
    /// one value, or a value cannot be read as the kind's attribute type.
    pub fn new<I, S>(kind: FilterKind, values: I, negate: bool) -> Result<Self, TriageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if kind.is_equality() && values.len() > 1 {
            return Err(TriageError::Filter(format!(
                "{kind} compares against a single value, got {}",
                values.len()
            )));
        }
        for value in &values {
            kind.validate(value)?;
        }
        Ok(Self {
            kind,
            values,
            negate,
        })
    }

    /// Build a filter from a kind name, as found in rule definitions.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Filter`] for unknown kinds or invalid values.
    pub fn parse<I, S>(kind: &str, values: I, negate: bool) -> Result<Self, TriageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(kind.parse()?, values, negate)
    }

    /// Evaluate the predicate against `pr`.
    pub fn matches(&self, pr: &PullRequest) -> bool {
        if self.values.is_empty() {
            return true;
        }
        let member = self
            .kind
            .attribute(pr)
            .is_some_and(|attr| self.values.iter().any(|v| *v == attr));
        member != self.negate
    }
}

/// Conjunction of filters.
///
/// # Examples
///
/// ```
/// use prtriage_core::PullRequest;
/// use prtriage_engine::filter::{FilterKind, FilterSet};
///
/// let mut filters = FilterSet::new();
/// assert!(filters.matches(&PullRequest::new("PrestaShop", 1, "Fix")));
///
/// filters.add(FilterKind::RepositoryPrivate, ["false"], false).unwrap();
/// filters.add(FilterKind::NumApproved, ["0"], false).unwrap();
/// assert!(filters.matches(&PullRequest::new("PrestaShop", 1, "Fix")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    /// An empty set, matching every pull request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter, replacing any earlier filter of the same kind.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Filter`] if the definition is invalid.
    pub fn add<I, S>(
        &mut self,
        kind: FilterKind,
        values: I,
        negate: bool,
    ) -> Result<&mut Self, TriageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let filter = Filter::new(kind, values, negate)?;
        self.filters.retain(|f| f.kind != kind);
        self.filters.push(filter);
        Ok(self)
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// `true` when the set holds no filter.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// `true` when every filter passes.
    pub fn matches(&self, pr: &PullRequest) -> bool {
        self.filters.iter().all(|f| f.matches(pr))
    }

    /// Keep the matching pull requests, preserving order.
    pub fn apply<'a>(
        &self,
        prs: impl IntoIterator<Item = &'a PullRequest>,
    ) -> Vec<&'a PullRequest> {
        prs.into_iter().filter(|pr| self.matches(pr)).collect()
    }
}
