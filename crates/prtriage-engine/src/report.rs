//! Terminal overview of the pull requests moving through the workflow.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use prtriage_core::{PullRequest, TriageConfig};
use serde::Serialize;

use crate::linked_issue::IssueReferenceRules;
use crate::query::{
    SearchQuery, LABEL_QA_OK, LABEL_WAITING_FOR_PM, LABEL_WAITING_FOR_QA, LABEL_WAITING_FOR_UX,
    LABEL_WAITING_FOR_WORDING,
};
use crate::source::PullRequestSource;

/// A workflow stage listed by the overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Merged since yesterday.
    Merged,
    /// Validated by QA, waiting to be merged.
    WaitingForMerge,
    /// Waiting for QA.
    WaitingForQa,
    /// Waiting for product management.
    WaitingForPm,
    /// Waiting for UX.
    WaitingForUx,
    /// Waiting for wording review.
    WaitingForWording,
}

impl Section {
    /// Every section, in display order.
    pub const ALL: [Section; 6] = [
        Section::Merged,
        Section::WaitingForMerge,
        Section::WaitingForQa,
        Section::WaitingForPm,
        Section::WaitingForUx,
        Section::WaitingForWording,
    ];

    /// Heading of the section.
    pub fn title(self) -> &'static str {
        match self {
            Section::Merged => "Merged PR",
            Section::WaitingForMerge => "PR Waiting for Merge",
            Section::WaitingForQa => "PR Waiting for QA",
            Section::WaitingForPm => "PR Waiting for PM",
            Section::WaitingForUx => "PR Waiting for UX",
            Section::WaitingForWording => "PR Waiting for Wording",
        }
    }

    /// Search listing the section's pull requests on `today`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use prtriage_engine::report::Section;
    ///
    /// let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    /// assert_eq!(
    ///     Section::Merged.query("PrestaShop", today).build(),
    ///     "org:PrestaShop is:pr is:merged merged:>2024-03-03"
    /// );
    /// ```
    pub fn query(self, organization: &str, today: NaiveDate) -> SearchQuery {
        let base = SearchQuery::org(organization).pull_requests();
        let label = match self {
            Section::Merged => {
                let yesterday = today - Duration::days(1);
                return base
                    .merged()
                    .merged_after(&yesterday.format("%Y-%m-%d").to_string());
            }
            Section::WaitingForMerge => LABEL_QA_OK,
            Section::WaitingForQa => LABEL_WAITING_FOR_QA,
            Section::WaitingForPm => LABEL_WAITING_FOR_PM,
            Section::WaitingForUx => LABEL_WAITING_FOR_UX,
            Section::WaitingForWording => LABEL_WAITING_FOR_WORDING,
        };
        base.open().with_label(label)
    }
}

/// Linked issue summary of a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCell {
    /// Issue number.
    pub number: u64,
    /// Browser URL.
    pub url: String,
    /// Whether the issue has a milestone.
    pub has_milestone: bool,
}

/// One pull request line of the overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    /// Repository name.
    pub project: String,
    /// Pull request number.
    pub number: u64,
    /// Browser URL.
    pub url: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Title.
    pub title: String,
    /// Author login.
    pub author: String,
    /// Whether the pull request has a milestone.
    pub has_milestone: bool,
    /// Linked issue, only looked up for the core repository.
    pub issue: Option<IssueCell>,
}

/// Rows of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionReport {
    /// The stage.
    pub section: Section,
    /// Its pull requests, in search order.
    pub rows: Vec<ReportRow>,
}

/// Gather every section.
///
/// A section whose search fails is logged and reported empty.
pub async fn collect(
    config: &TriageConfig,
    source: &dyn PullRequestSource,
    today: NaiveDate,
) -> Vec<SectionReport> {
    let github = &config.github;
    let issue_rules = match IssueReferenceRules::new(&github.organization, &github.core_repository)
    {
        Ok(rules) => Some(rules),
        Err(e) => {
            tracing::warn!(error = %e, "issue lookup disabled");
            None
        }
    };

    let mut sections = Vec::new();
    for section in Section::ALL {
        let query = section.query(&github.organization, today).build();
        let found = match source.search(&query).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(section = section.title(), error = %e, "search failed");
                Vec::new()
            }
        };

        let mut rows = Vec::with_capacity(found.len());
        for pr in found {
            let issue = match &issue_rules {
                Some(rules) if pr.repository == github.core_repository => {
                    rules.resolve(source, &pr.body).await.map(|issue| IssueCell {
                        number: issue.number,
                        url: issue.url,
                        has_milestone: issue.milestone.is_some_and(|m| !m.is_empty()),
                    })
                }
                _ => None,
            };
            rows.push(row(pr, issue));
        }
        sections.push(SectionReport { section, rows });
    }
    sections
}

fn row(pr: PullRequest, issue: Option<IssueCell>) -> ReportRow {
    ReportRow {
        has_milestone: pr.milestone.as_deref().is_some_and(|m| !m.is_empty()),
        project: pr.repository,
        number: pr.number,
        url: pr.url,
        created_at: pr.created_at,
        title: pr.title,
        author: pr.author,
        issue,
    }
}

fn check(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}

/// Render non-empty sections as a plain text table.
///
/// # Examples
///
/// ```
/// use prtriage_engine::report::render_table;
///
/// assert_eq!(render_table(&[]), "No pull requests.\n");
/// ```
pub fn render_table(sections: &[SectionReport]) -> String {
    const HEADERS: [&str; 7] = [
        "Project",
        "#",
        "Created At",
        "Title",
        "Author",
        "Milestone",
        "Issue",
    ];

    let mut out = String::new();
    for report in sections.iter().filter(|s| !s.rows.is_empty()) {
        let cells: Vec<[String; 7]> = report
            .rows
            .iter()
            .map(|r| {
                [
                    r.project.clone(),
                    format!("#{}", r.number),
                    r.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                    r.title.clone(),
                    r.author.clone(),
                    check(r.has_milestone).to_string(),
                    r.issue
                        .as_ref()
                        .map(|i| format!("{} #{}", check(i.has_milestone), i.number))
                        .unwrap_or_default(),
                ]
            })
            .collect();

        let mut widths = HEADERS.map(|h| h.chars().count());
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "{} ({})", report.section.title(), cells.len());
        write_row(&mut out, &HEADERS.map(String::from), &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", rule.join("-+-"));
        for row in &cells {
            write_row(&mut out, row, &widths);
        }
    }
    if out.is_empty() {
        out.push_str("No pull requests.\n");
    }
    out
}

fn write_row(out: &mut String, cells: &[String; 7], widths: &[usize; 7]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_sections_search_open_pull_requests() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(
            Section::WaitingForMerge.query("PrestaShop", today).build(),
            r#"org:PrestaShop is:pr is:open label:"QA ✔️""#
        );
        assert_eq!(
            Section::WaitingForWording.query("acme", today).build(),
            r#"org:acme is:pr is:open label:"waiting for wording""#
        );
    }

    #[test]
    fn merged_section_crosses_month_boundary() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(Section::Merged
            .query("acme", today)
            .build()
            .ends_with("merged:>2024-02-29"));
    }

    #[test]
    fn table_marks_missing_milestones() {
        let mut pr = PullRequest::new("PrestaShop", 12, "Fix cart");
        pr.author = "alice".into();
        let rows = vec![row(
            pr,
            Some(IssueCell {
                number: 99,
                url: String::new(),
                has_milestone: true,
            }),
        )];
        let table = render_table(&[
            SectionReport {
                section: Section::Merged,
                rows: Vec::new(),
            },
            SectionReport {
                section: Section::WaitingForQa,
                rows,
            },
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "PR Waiting for QA (1)");
        assert!(lines[1].starts_with("Project    | #   | Created At"));
        assert!(lines[3].contains("| alice  | ✗         | ✓ #99"));
        assert!(!table.contains("Merged PR"));
    }
}
