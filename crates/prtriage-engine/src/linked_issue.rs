//! Best-effort resolution of the issue a pull request fixes.
//!
//! The pull request body is scanned with an ordered list of extraction
//! rules; the first rule that matches wins. Nothing here fails the caller:
//! a body without a reference, or an issue lookup error, both resolve to
//! "no linked issue".

use prtriage_core::{LinkedIssue, TriageError};
use regex::Regex;

use crate::source::PullRequestSource;

/// Ordered issue-reference patterns for one core repository.
///
/// # Examples
///
/// ```
/// use prtriage_engine::linked_issue::IssueReferenceRules;
///
/// let rules = IssueReferenceRules::new("PrestaShop", "PrestaShop").unwrap();
/// assert_eq!(rules.extract("Fixes #123"), Some(123));
/// assert_eq!(rules.extract("Fixes issue #45"), Some(45));
/// assert_eq!(
///     rules.extract("Fixes https://github.com/PrestaShop/PrestaShop/issues/678"),
///     Some(678)
/// );
/// assert_eq!(rules.extract("Related to #9"), None);
/// ```
#[derive(Debug, Clone)]
pub struct IssueReferenceRules {
    rules: Vec<Regex>,
}

impl IssueReferenceRules {
    /// Build the rules for issues of `organization/repository`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] if a pattern cannot be compiled.
    pub fn new(organization: &str, repository: &str) -> Result<Self, TriageError> {
        let patterns = [
            r"Fixes\s#([0-9]{1,5})".to_string(),
            r"Fixes\sissue\s#([0-9]{1,5})".to_string(),
            format!(
                r"Fixes\shttps://github\.com/{}/{}/issues/([0-9]{{1,5}})",
                regex::escape(organization),
                regex::escape(repository)
            ),
        ];
        let rules = patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| TriageError::Config(format!("invalid issue pattern {p}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Issue number referenced by `body`, trying each rule in order.
    pub fn extract(&self, body: &str) -> Option<u64> {
        self.rules.iter().find_map(|rule| {
            rule.captures(body)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    }

    /// Extract the reference and fetch the issue.
    ///
    /// Lookup failures are logged and resolve to `None`.
    pub async fn resolve(&self, source: &dyn PullRequestSource, body: &str) -> Option<LinkedIssue> {
        let number = self.extract(body)?;
        match source.issue(number).await {
            Ok(issue) => Some(issue),
            Err(e) => {
                tracing::warn!(issue = number, error = %e, "linked issue lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Rule, RuleContext, RuleOutput};
    use crate::source::{NightlyReport, NightlyReports};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use prtriage_core::{PullRequest, TriageConfig};

    /// Search works, issue lookups fail.
    struct IssuesDown;

    #[async_trait]
    impl PullRequestSource for IssuesDown {
        async fn search(&self, _query: &str) -> Result<Vec<PullRequest>, TriageError> {
            let mut pr = PullRequest::new("PrestaShop", 40, "Fix cart rules");
            pr.body = "Fixes #12".into();
            pr.milestone = Some("8.1.0".into());
            Ok(vec![pr])
        }
        async fn count(&self, _query: &str) -> Result<u64, TriageError> {
            Ok(0)
        }
        async fn issue(&self, _number: u64) -> Result<LinkedIssue, TriageError> {
            Err(TriageError::GitHub("down".into()))
        }
        async fn branches(&self, _repository: &str) -> Result<Vec<String>, TriageError> {
            Ok(Vec::new())
        }
        async fn file_content(&self, _: &str, _: &str, _: &str) -> Result<String, TriageError> {
            Ok("const VERSION = '9.0.0';".into())
        }
    }

    struct NoReports;

    #[async_trait]
    impl NightlyReports for NoReports {
        async fn report(
            &self,
            _: NaiveDate,
            _: &str,
            _: &str,
        ) -> Result<Option<NightlyReport>, TriageError> {
            Ok(None)
        }
    }

    fn rules() -> IssueReferenceRules {
        IssueReferenceRules::new("PrestaShop", "PrestaShop").unwrap()
    }

    #[test]
    fn first_rule_wins() {
        let body = "Fixes issue #2\nFixes #1";
        assert_eq!(rules().extract(body), Some(1));
    }

    #[test]
    fn url_rule_only_for_core_repository() {
        let body = "Fixes https://github.com/PrestaShop/ps_banner/issues/12";
        assert_eq!(rules().extract(body), None);
    }

    #[test]
    fn at_most_five_digits_are_read() {
        assert_eq!(rules().extract("Fixes #1234567"), Some(12345));
    }

    #[test]
    fn reference_inside_table() {
        let body = "| Questions | Answers\n| Fixed ticket? | Fixes #31337\n";
        assert_eq!(rules().extract(body), Some(31337));
    }

    #[test]
    fn lowercase_keyword_is_ignored() {
        assert_eq!(rules().extract("fixes #10"), None);
    }

    #[test]
    fn empty_body_has_no_reference() {
        assert_eq!(rules().extract(""), None);
    }

    #[tokio::test]
    async fn failed_lookup_resolves_to_none() {
        assert!(rules().resolve(&IssuesDown, "Fixes #12").await.is_none());
    }

    #[tokio::test]
    async fn failed_lookup_keeps_pull_request_in_queue() {
        let config = TriageConfig::default();
        let ctx = RuleContext {
            config: &config,
            source: &IssuesDown,
            nightly: &NoReports,
            today: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        };

        let RuleOutput::Qa(message) = Rule::ReadyToTest.evaluate(&ctx).await.unwrap() else {
            panic!("ready-to-test renders for the QA channel");
        };
        assert!(message.starts_with(":eyes: PR Ready to Test *(1)* :eyes:\n"));
        assert!(message.contains(" - *[8.1.0]* <"));
        assert!(message.contains("PrestaShop#40> : Fix cart rules"));
        assert!(!message.contains("*_["));
    }
}
