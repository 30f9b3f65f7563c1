//! QA queue ordering and milestone grouping.
//!
//! Milestones compare as plain strings: `"1.10" < "1.9"` and
//! `"9.0" < "develop"`. This is the queue order the QA team works from and
//! must not be replaced by a semantic version comparison.

use std::cmp::Ordering;

use prtriage_core::{LinkedIssue, Priority, PullRequest};
use serde::Serialize;

/// A pull request with the values derived for ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPullRequest {
    /// The pull request as fetched.
    pub pull_request: PullRequest,
    /// Issue it fixes, if resolved.
    pub linked_issue: Option<LinkedIssue>,
    /// Priority from the linked issue's labels.
    pub priority: Priority,
    /// Milestone used for ordering and grouping. Empty outside the core
    /// repository.
    pub milestone: String,
}

impl RankedPullRequest {
    /// Derive priority and milestone for `pull_request`.
    ///
    /// Core repository pull requests without a milestone fall back to
    /// `next_version`; every other repository resolves to the empty milestone.
    ///
    /// # Examples
    ///
    /// ```
    /// use prtriage_core::{LinkedIssue, Priority, PullRequest};
    /// use prtriage_engine::ranking::RankedPullRequest;
    ///
    /// let pr = PullRequest::new("PrestaShop", 1, "Fix");
    /// let issue = LinkedIssue::new(9).with_label("Nice-to-have");
    /// let ranked = RankedPullRequest::new(pr, Some(issue), "PrestaShop", "8.2.0");
    /// assert_eq!(ranked.milestone, "8.2.0");
    /// assert_eq!(ranked.priority, Priority::NiceToHave);
    /// ```
    pub fn new(
        pull_request: PullRequest,
        linked_issue: Option<LinkedIssue>,
        core_repository: &str,
        next_version: &str,
    ) -> Self {
        let priority = linked_issue
            .as_ref()
            .map(LinkedIssue::priority)
            .unwrap_or_default();
        let milestone = if pull_request.repository == core_repository {
            pull_request
                .milestone
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| next_version.to_string())
        } else {
            String::new()
        };
        Self {
            pull_request,
            linked_issue,
            priority,
            milestone,
        }
    }
}

/// Orders pull requests for the QA queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranker {
    core_repository: String,
}

impl Ranker {
    /// Rank with `core_repository` sorting first.
    pub fn new(core_repository: impl Into<String>) -> Self {
        Self {
            core_repository: core_repository.into(),
        }
    }

    fn is_core(&self, pr: &RankedPullRequest) -> bool {
        pr.pull_request.repository == self.core_repository
    }

    /// Queue order: core repository first; inside it milestone ascending then
    /// priority descending; creation time ascending for everything else.
    pub fn compare(&self, a: &RankedPullRequest, b: &RankedPullRequest) -> Ordering {
        let (a_core, b_core) = (self.is_core(a), self.is_core(b));
        b_core
            .cmp(&a_core)
            .then_with(|| {
                if a_core && b_core {
                    a.milestone
                        .cmp(&b.milestone)
                        .then_with(|| b.priority.cmp(&a.priority))
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| a.pull_request.created_at.cmp(&b.pull_request.created_at))
    }

    /// Sort `items` into queue order. Full ties keep their input order.
    pub fn rank(&self, mut items: Vec<RankedPullRequest>) -> Vec<RankedPullRequest> {
        items.sort_by(|a, b| self.compare(a, b));
        items
    }
}

/// A visible block of the QA queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneGroup {
    /// Milestone shared by every item.
    pub milestone: String,
    /// `true` when this block continues the previous block's milestone after
    /// the size cap was reached.
    pub continuation: bool,
    /// Items, in queue order.
    pub items: Vec<RankedPullRequest>,
}

/// Split a ranked list into display blocks.
///
/// A block closes when the milestone changes or when it holds `cap` items.
/// Closing on the cap starts a continuation block of the same milestone, so
/// no item is ever dropped. A `cap` of zero disables the size limit.
///
/// # Examples
///
/// ```
/// use prtriage_core::PullRequest;
/// use prtriage_engine::ranking::{group_by_milestone, RankedPullRequest};
///
/// let items: Vec<_> = (1..=4)
///     .map(|n| PullRequest::new("PrestaShop", n, "Fix"))
///     .map(|pr| RankedPullRequest::new(pr, None, "PrestaShop", "8.1.0"))
///     .collect();
/// let groups = group_by_milestone(items, 3);
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].items.len(), 3);
/// assert!(groups[1].continuation);
/// ```
pub fn group_by_milestone(items: Vec<RankedPullRequest>, cap: usize) -> Vec<MilestoneGroup> {
    let mut groups: Vec<MilestoneGroup> = Vec::new();
    for item in items {
        match groups.last_mut() {
            Some(open)
                if open.milestone == item.milestone && (cap == 0 || open.items.len() < cap) =>
            {
                open.items.push(item);
            }
            Some(open) if open.milestone == item.milestone => {
                let milestone = open.milestone.clone();
                groups.push(MilestoneGroup {
                    milestone,
                    continuation: true,
                    items: vec![item],
                });
            }
            _ => groups.push(MilestoneGroup {
                milestone: item.milestone.clone(),
                continuation: false,
                items: vec![item],
            }),
        }
    }
    groups
}
