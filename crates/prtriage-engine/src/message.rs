//! Slack message rendering.
//!
//! Every function returns one complete message: a title line followed by
//! its body, each line terminated by `\n`. Formatting never fails.

use prtriage_core::{Maintainer, Priority, PullRequest};

use crate::naming::Violation;
use crate::query::search_url;
use crate::ranking::MilestoneGroup;
use crate::source::NightlyReport;

const GREETING: &str = ":preston::date: Welcome to the PrestHubot Report of the day :date:";
const NIGHTLY_TITLE: &str =
    ":notebook_with_decorative_cover: Nightly Board :notebook_with_decorative_cover:";
const STATS_TITLE: &str = ":chart_with_upwards_trend: PR Stats for QA :chart_with_upwards_trend:";
const REVIEW_TITLE: &str = ":pray: Could you review these PRs ? :pray:";
const NAMING_TITLE: &str = ":pray: Could you fix these PRs ? :pray:";

/// Milestone label shown for pull requests outside the core repository.
pub const MODULES_MILESTONE: &str = "Modules";

/// Opening message of the daily QA report.
pub fn greeting() -> String {
    format!("{GREETING}\n")
}

/// Slack link to a pull request: `<url|:preston: repo#number>`.
///
/// # Examples
///
/// ```
/// use prtriage_core::PullRequest;
/// use prtriage_engine::message::pull_request_link;
///
/// let pr = PullRequest::new("ps_banner", 12, "Fix");
/// assert_eq!(
///     pull_request_link(&pr),
///     "<https://github.com/ps_banner/pull/12|:preston: ps_banner#12>"
/// );
/// ```
pub fn pull_request_link(pr: &PullRequest) -> String {
    format!("<{}|:preston: {}>", pr.url, pr.reference())
}

/// Turns GitHub logins of known maintainers into Slack mentions.
///
/// Only logins rendered as people (approvers) are linked; titles, URLs and
/// repository names are left verbatim even when they contain a login.
///
/// # Examples
///
/// ```
/// use prtriage_core::Maintainer;
/// use prtriage_engine::message::MentionLinker;
///
/// let linker = MentionLinker::new(vec![Maintainer::new("alice", "U01")]);
/// assert_eq!(linker.mention("alice"), "<@U01>");
/// assert_eq!(linker.mention("stranger"), "stranger");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MentionLinker {
    roster: Vec<Maintainer>,
}

impl MentionLinker {
    /// Link the logins of `roster`.
    pub fn new(roster: Vec<Maintainer>) -> Self {
        Self { roster }
    }

    /// Mention markup for `login`, or the login itself when unknown.
    pub fn mention(&self, login: &str) -> String {
        self.roster
            .iter()
            .find(|m| m.github == login)
            .map(Maintainer::mention)
            .unwrap_or_else(|| login.to_string())
    }
}

/// Review request for one maintainer; approvers are listed under each
/// pull request that already has some.
pub fn review_message(prs: &[&PullRequest], linker: &MentionLinker) -> String {
    let mut message = format!("{REVIEW_TITLE}\n");
    for pr in prs {
        message.push_str(&format!(" - {} : {}", pull_request_link(pr), pr.title));
        if !pr.approvals.is_empty() {
            let approvers: Vec<String> = pr.approvals.iter().map(|a| linker.mention(a)).collect();
            message.push_str(&format!("\n    - :heavy_check_mark: {}", approvers.join(", ")));
        }
        message.push_str("\n\n");
    }
    message
}

/// Fix request for one maintainer: each pull request with its violations.
pub fn naming_message(items: &[(&PullRequest, Vec<Violation>)]) -> String {
    let mut message = format!("{NAMING_TITLE}\n");
    for (pr, violations) in items {
        message.push_str(&format!(" - {} : {}\n", pull_request_link(pr), pr.title));
        for violation in violations {
            message.push_str(&format!("    - :red_circle: {violation}\n"));
        }
        message.push_str("\n\n");
    }
    message
}

/// Ranked QA queue, one blank line between display blocks.
///
/// # Examples
///
/// ```
/// use prtriage_core::PullRequest;
/// use prtriage_engine::message::ready_to_test_message;
/// use prtriage_engine::ranking::{group_by_milestone, RankedPullRequest};
///
/// let pr = PullRequest::new("ps_banner", 3, "Fix banner");
/// let item = RankedPullRequest::new(pr, None, "PrestaShop", "8.1.0");
/// let groups = group_by_milestone(vec![item], 3);
/// let message = ready_to_test_message(&groups);
/// assert!(message.starts_with(":eyes: PR Ready to Test *(1)* :eyes:\n"));
/// assert!(message.contains(" - *[Modules]* <"));
/// ```
pub fn ready_to_test_message(groups: &[MilestoneGroup]) -> String {
    let total: usize = groups.iter().map(|g| g.items.len()).sum();
    let mut message = format!(":eyes: PR Ready to Test *({total})* :eyes:\n");
    for (index, group) in groups.iter().enumerate() {
        if index > 0 {
            message.push('\n');
        }
        let milestone = if group.milestone.is_empty() {
            MODULES_MILESTONE
        } else {
            group.milestone.as_str()
        };
        for item in &group.items {
            message.push_str(&format!(" - *[{milestone}]* "));
            if item.priority != Priority::None {
                message.push_str(&format!("*_[{}]_* ", item.priority));
            }
            message.push_str(&format!(
                "{} : {}\n",
                pull_request_link(&item.pull_request),
                item.pull_request.title
            ));
        }
    }
    message
}

/// One counted search of the QA statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatLine {
    /// Text after `PR ` in the link label.
    pub label: String,
    /// Search query whose results were counted.
    pub query: String,
    /// Number of results.
    pub count: u64,
}

/// QA statistics, each count linking to its search results.
///
/// # Examples
///
/// ```
/// use prtriage_engine::message::{qa_stats_message, StatLine};
///
/// let lines = [StatLine { label: "develop".into(), query: "is:pr".into(), count: 4 }];
/// let message = qa_stats_message(&lines);
/// assert!(message.ends_with("- <https://github.com/search?q=is%3Apr|PR develop> : *4*\n"));
/// ```
pub fn qa_stats_message(lines: &[StatLine]) -> String {
    let mut message = format!("{STATS_TITLE}\n");
    for line in lines {
        message.push_str(&format!(
            "- <{}|PR {}> : *{}*\n",
            search_url(&line.query),
            line.label,
            line.count
        ));
    }
    message
}

/// A published nightly report with the run it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightlyEntry {
    /// Tested branch.
    pub branch: String,
    /// Test campaign.
    pub campaign: String,
    /// Report summary.
    pub report: NightlyReport,
}

fn format_duration(duration: chrono::Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    format!(
        "{:02}h {:02}m {:02}s",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Nightly board status, one line per published report.
///
/// `report_url` is the board page; the report id is appended to it.
pub fn nightly_message(entries: &[NightlyEntry], report_url: &str) -> String {
    let mut message = format!("{NIGHTLY_TITLE}\n");
    for entry in entries {
        let report = &entry.report;
        let light = if report.is_green() {
            ":greenlight:"
        } else {
            ":redlight:"
        };
        let tests = report.tests.clone().unwrap_or_default();

        let mut counters = Vec::new();
        if let Some(passed) = tests.passed {
            counters.push(format!(":heavy_check_mark: {passed}"));
        }
        if let Some(failed) = tests.failed {
            counters.push(format!(":x: {failed}"));
        }
        if let Some(pending) = tests.pending {
            counters.push(format!("⏸️ {pending}"));
        }
        counters.push(format!(":timer_clock: {}", format_duration(report.duration())));

        message.push_str(&format!(
            " - <{}/{}|{light} Report -{}({})> : {}\n",
            report_url.trim_end_matches('/'),
            report.id,
            entry.branch,
            entry.campaign,
            counters.join(" - ")
        ));
    }
    message
}

/// Weekly reminder to merge the newest maintenance branch into develop.
///
/// # Examples
///
/// ```
/// use prtriage_engine::message::merge_reminder_message;
///
/// assert_eq!(
///     merge_reminder_message("8.1.x", "develop"),
///     ":arrow_right: We are Monday. Don't forget to merge `8.1.x` in `develop`! :muscle:\n"
/// );
/// ```
pub fn merge_reminder_message(branch: &str, develop_branch: &str) -> String {
    format!(
        ":arrow_right: We are Monday. \
         Don't forget to merge `{branch}` in `{develop_branch}`! :muscle:\n"
    )
}
