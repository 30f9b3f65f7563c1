use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use prtriage_core::{Maintainer, PullRequest, TriageConfig, TriageError};
use serde::Serialize;

use crate::allocator::Allocator;
use crate::filter::{FilterKind, FilterSet};
use crate::linked_issue::IssueReferenceRules;
use crate::message::{self, MentionLinker, NightlyEntry, StatLine};
use crate::naming::{NamingChecker, Violation};
use crate::pool::MaintainerPool;
use crate::query::{
    SearchQuery, StoredRequest, LABEL_BLOCKED, LABEL_WAITING_FOR_AUTHOR, LABEL_WAITING_FOR_DEV,
    LABEL_WAITING_FOR_PM, LABEL_WAITING_FOR_QA, NOT_READY_FOR_QA,
};
use crate::ranking::{group_by_milestone, RankedPullRequest, Ranker};
use crate::source::{NightlyReports, PullRequestSource};
use crate::version::{declared_version, highest_version_branch};

/// Highest approval count considered when ordering review requests.
const MAX_APPROVALS: usize = 5;

/// Everything a rule reads: configuration, collaborators and the run date.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    /// Run configuration.
    pub config: &'a TriageConfig,
    /// Pull request search.
    pub source: &'a dyn PullRequestSource,
    /// Nightly report board.
    pub nightly: &'a dyn NightlyReports,
    /// Day the run reports on.
    pub today: NaiveDate,
}

impl RuleContext<'_> {
    fn pool(&self) -> MaintainerPool {
        MaintainerPool::from_team(&self.config.team)
    }

    fn linker(&self) -> MentionLinker {
        MentionLinker::new(self.config.team.maintainers.clone())
    }

    fn organization(&self) -> &str {
        &self.config.github.organization
    }

    fn core_repository(&self) -> &str {
        &self.config.github.core_repository
    }

    fn specs_repository(&self) -> &str {
        &self.config.github.specs_repository
    }
}

/// A message for one maintainer's private channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivateMessage {
    /// Recipient.
    pub maintainer: Maintainer,
    /// Rendered message.
    pub text: String,
}

/// What a rule produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutput {
    /// One message for the QA channel.
    Qa(String),
    /// Messages for maintainers' private channels.
    Maintainers(Vec<PrivateMessage>),
}

/// The rules of a run, in execution order.
///
/// Each rule queries its collaborators, applies the engine components and
/// renders its messages. Rules are independent: an error ends only the rule
/// that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Opening title of the QA report.
    Greeting,
    /// Today's nightly test reports.
    NightlyStatus,
    /// Counts of pull requests awaiting QA.
    QaStats,
    /// Ranked queue of pull requests ready to test.
    ReadyToTest,
    /// Review requests distributed over the maintainer pool.
    ReviewDistribution,
    /// Merged pull requests breaking the naming rules.
    NamingReport,
    /// Monday reminder to merge the maintenance branch.
    MergeReminder,
}

impl Rule {
    /// Every rule, in execution order.
    pub const ALL: [Rule; 7] = [
        Rule::Greeting,
        Rule::NightlyStatus,
        Rule::QaStats,
        Rule::ReadyToTest,
        Rule::ReviewDistribution,
        Rule::NamingReport,
        Rule::MergeReminder,
    ];

    /// Evaluate the rule.
    ///
    /// # Errors
    ///
    /// Propagates collaborator failures and invalid configuration.
    pub async fn evaluate(self, ctx: &RuleContext<'_>) -> Result<RuleOutput, TriageError> {
        match self {
            Rule::Greeting => Ok(RuleOutput::Qa(message::greeting())),
            Rule::NightlyStatus => nightly_status(ctx).await.map(RuleOutput::Qa),
            Rule::QaStats => qa_stats(ctx).await.map(RuleOutput::Qa),
            Rule::ReadyToTest => ready_to_test(ctx).await.map(RuleOutput::Qa),
            Rule::ReviewDistribution => review_distribution(ctx).await.map(RuleOutput::Maintainers),
            Rule::NamingReport => naming_report(ctx).await.map(RuleOutput::Maintainers),
            Rule::MergeReminder => merge_reminder(ctx).await.map(RuleOutput::Maintainers),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Greeting => write!(f, "greeting"),
            Rule::NightlyStatus => write!(f, "nightly_status"),
            Rule::QaStats => write!(f, "qa_stats"),
            Rule::ReadyToTest => write!(f, "ready_to_test"),
            Rule::ReviewDistribution => write!(f, "review_distribution"),
            Rule::NamingReport => write!(f, "naming_report"),
            Rule::MergeReminder => write!(f, "merge_reminder"),
        }
    }
}

/// Nightly board summary for every supported branch and campaign.
///
/// A lookup that fails is logged and left off the board.
pub async fn nightly_status(ctx: &RuleContext<'_>) -> Result<String, TriageError> {
    let mut entries = Vec::new();
    for branch in &ctx.config.qa.branches {
        for campaign in &ctx.config.qa.campaigns {
            let report = match ctx.nightly.report(ctx.today, branch, campaign).await {
                Ok(Some(report)) => report,
                Ok(None) => {
                    tracing::debug!(%branch, %campaign, "no nightly report");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%branch, %campaign, error = %e, "nightly lookup failed");
                    continue;
                }
            };
            entries.push(NightlyEntry {
                branch: branch.clone(),
                campaign: campaign.clone(),
                report,
            });
        }
    }
    Ok(message::nightly_message(
        &entries,
        &ctx.config.nightly.report_url,
    ))
}

/// The counted searches of the QA statistics, in display order.
pub fn qa_stat_queries(config: &TriageConfig) -> Vec<(String, SearchQuery)> {
    let org = config.github.organization.as_str();
    let core = config.github.core_repository.as_str();
    let specs = config.github.specs_repository.as_str();

    let mut queries: Vec<(String, SearchQuery)> = config
        .qa
        .branches
        .iter()
        .map(|branch| {
            let query = SearchQuery::repo(org, core)
                .pull_requests()
                .open()
                .base(branch)
                .with_label(LABEL_WAITING_FOR_QA)
                .without_labels(&NOT_READY_FOR_QA);
            (branch.clone(), query)
        })
        .collect();

    queries.push((
        "Modules".into(),
        SearchQuery::org(org)
            .not_archived()
            .excluding_repo(org, core)
            .excluding_repo(org, specs)
            .pull_requests()
            .open()
            .with_label(LABEL_WAITING_FOR_QA)
            .without_labels(&NOT_READY_FOR_QA),
    ));
    queries.push((
        "Specs".into(),
        SearchQuery::repo(org, specs)
            .pull_requests()
            .open()
            .with_label(LABEL_WAITING_FOR_QA)
            .without_labels(&NOT_READY_FOR_QA),
    ));
    for (label, extra) in [
        ("Waiting for Author", LABEL_WAITING_FOR_AUTHOR),
        ("Blocked", LABEL_BLOCKED),
    ] {
        queries.push((
            label.into(),
            SearchQuery::org(org)
                .not_archived()
                .pull_requests()
                .open()
                .with_label(LABEL_WAITING_FOR_QA)
                .with_label(extra)
                .without_label(LABEL_WAITING_FOR_DEV)
                .without_label(LABEL_WAITING_FOR_PM),
        ));
    }
    queries
}

/// Counts of pull requests per QA queue.
pub async fn qa_stats(ctx: &RuleContext<'_>) -> Result<String, TriageError> {
    let mut lines = Vec::new();
    for (label, query) in qa_stat_queries(ctx.config) {
        let query = query.build();
        let count = ctx.source.count(&query).await?;
        tracing::debug!(%label, count, "qa statistic");
        lines.push(StatLine {
            label,
            query,
            count,
        });
    }
    Ok(message::qa_stats_message(&lines))
}

/// Upcoming version of the core repository, `develop` when undeclared.
///
/// A failed lookup is logged and falls back as well.
pub async fn next_version(ctx: &RuleContext<'_>) -> String {
    let github = &ctx.config.github;
    match ctx
        .source
        .file_content(&github.core_repository, &github.version_file, &github.develop_branch)
        .await
    {
        Ok(content) => declared_version(&content)
            .unwrap_or(&github.develop_branch)
            .to_string(),
        Err(e) => {
            tracing::warn!(error = %e, file = %github.version_file, "version lookup failed");
            github.develop_branch.clone()
        }
    }
}

/// Pull requests awaiting QA, ranked, with their linked issues resolved.
pub async fn ready_to_test_queue(
    ctx: &RuleContext<'_>,
) -> Result<Vec<RankedPullRequest>, TriageError> {
    let next_version = next_version(ctx).await;
    let query = SearchQuery::org(ctx.organization())
        .pull_requests()
        .request(StoredRequest::PrWaitingForQa)
        .build();
    let found = ctx.source.search(&query).await?;

    let mut filters = FilterSet::new();
    filters.add(FilterKind::RepositoryName, [ctx.specs_repository()], true)?;
    let issue_rules = IssueReferenceRules::new(ctx.organization(), ctx.core_repository())?;

    let mut queue = Vec::new();
    for pr in filters.apply(&found) {
        let linked_issue = issue_rules.resolve(ctx.source, &pr.body).await;
        queue.push(RankedPullRequest::new(
            pr.clone(),
            linked_issue,
            ctx.core_repository(),
            &next_version,
        ));
    }
    tracing::info!(count = queue.len(), %next_version, "pull requests ready to test");

    Ok(Ranker::new(ctx.core_repository()).rank(queue))
}

/// Ranked QA queue message.
pub async fn ready_to_test(ctx: &RuleContext<'_>) -> Result<String, TriageError> {
    let queue = ready_to_test_queue(ctx).await?;
    let groups = group_by_milestone(queue, ctx.config.qa.milestone_group_size);
    Ok(message::ready_to_test_message(&groups))
}

/// Pull requests awaiting review, most approved first.
///
/// Private repositories and the specs repository are left out.
pub async fn review_candidates(ctx: &RuleContext<'_>) -> Result<Vec<PullRequest>, TriageError> {
    let query = SearchQuery::org(ctx.organization())
        .pull_requests()
        .request(StoredRequest::PrWaitingForReview)
        .build();
    let found = ctx.source.search(&query).await?;

    let mut filters = FilterSet::new();
    filters.add(FilterKind::RepositoryPrivate, ["false"], false)?;
    filters.add(FilterKind::RepositoryName, [ctx.specs_repository()], true)?;

    let mut candidates = Vec::new();
    for approvals in (0..=MAX_APPROVALS).rev() {
        filters.add(FilterKind::NumApproved, [approvals.to_string()], false)?;
        candidates.extend(filters.apply(&found).into_iter().cloned());
    }
    Ok(candidates)
}

/// Review requests, two reviewers per pull request, never the author or
/// someone who already approved.
pub async fn review_distribution(
    ctx: &RuleContext<'_>,
) -> Result<Vec<PrivateMessage>, TriageError> {
    let candidates = review_candidates(ctx).await?;
    let pool = ctx.pool();
    let allocator = Allocator::new(
        ctx.config.team.quota,
        ctx.config.team.reviewers_per_pull_request,
    );
    let assignment = allocator.assign(candidates.iter(), &pool, |member, pr| {
        pr.author == member.github || pr.is_approved_by(&member.github)
    });
    tracing::info!(
        candidates = candidates.len(),
        assigned = assignment.assigned_count(),
        unassigned = assignment.unassigned.len(),
        "review requests distributed"
    );

    let linker = ctx.linker();
    Ok(assignment
        .non_empty()
        .map(|(maintainer, prs)| PrivateMessage {
            maintainer: maintainer.clone(),
            text: message::review_message(prs, &linker),
        })
        .collect())
}

/// Merged pull requests with naming violations, one maintainer each.
pub async fn naming_report(ctx: &RuleContext<'_>) -> Result<Vec<PrivateMessage>, TriageError> {
    let checker = NamingChecker::new(&ctx.config.naming)?;
    let query = SearchQuery::repo(ctx.organization(), ctx.core_repository())
        .pull_requests()
        .merged()
        .sort_created()
        .build();
    let merged = ctx.source.search(&query).await?;

    let flagged: Vec<(&PullRequest, Vec<Violation>)> = merged
        .iter()
        .map(|pr| (pr, checker.validate(pr)))
        .filter(|(_, violations)| !violations.is_empty())
        .collect();

    let pool = ctx.pool();
    let allocator = Allocator::new(ctx.config.team.quota, 1);
    let assignment = allocator.assign(flagged.iter().cloned(), &pool, |_, _| false);
    tracing::info!(
        merged = merged.len(),
        flagged = flagged.len(),
        assigned = assignment.assigned_count(),
        "naming report built"
    );

    Ok(assignment
        .non_empty()
        .map(|(maintainer, items)| PrivateMessage {
            maintainer: maintainer.clone(),
            text: message::naming_message(items),
        })
        .collect())
}

/// On Mondays, remind every pool member to merge the newest maintenance
/// branch into develop.
pub async fn merge_reminder(ctx: &RuleContext<'_>) -> Result<Vec<PrivateMessage>, TriageError> {
    if ctx.today.weekday() != Weekday::Mon {
        return Ok(Vec::new());
    }
    let branches = ctx.source.branches(ctx.core_repository()).await?;
    let Some(branch) = highest_version_branch(branches.iter().map(String::as_str)) else {
        tracing::warn!(repository = %ctx.core_repository(), "no maintenance branch found");
        return Ok(Vec::new());
    };

    let text = message::merge_reminder_message(branch, &ctx.config.github.develop_branch);
    Ok(ctx
        .pool()
        .iter()
        .map(|maintainer| PrivateMessage {
            maintainer: maintainer.clone(),
            text: text.clone(),
        })
        .collect())
}
