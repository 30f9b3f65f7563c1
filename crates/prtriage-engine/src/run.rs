use std::fmt;

use chrono::NaiveDate;
use prtriage_core::TriageConfig;
use serde::Serialize;

use crate::outbox::Outbox;
use crate::rules::{Rule, RuleContext, RuleOutput};
use crate::source::{NightlyReports, Notifier, PullRequestSource};

/// Result of a notification run.
///
/// # Examples
///
/// ```
/// use prtriage_engine::outbox::Outbox;
/// use prtriage_engine::run::{RunResult, RunStats};
///
/// let result = RunResult {
///     outbox: Outbox::new(),
///     stats: RunStats::default(),
/// };
/// assert!(result.outbox.is_empty());
/// assert!(result.to_string().contains("Nothing to send."));
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Messages per channel.
    pub outbox: Outbox,
    /// Statistics about the run.
    pub stats: RunStats,
}

/// Statistics about a notification run.
///
/// # Examples
///
/// ```
/// use prtriage_engine::run::RunStats;
///
/// let stats = RunStats {
///     rules_evaluated: 7,
///     rules_failed: vec!["qa_stats".into()],
///     ..RunStats::default()
/// };
/// assert_eq!(stats.rules_evaluated - stats.rules_failed.len(), 6);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// Rules attempted.
    pub rules_evaluated: usize,
    /// Rules that contributed nothing because of an error.
    pub rules_failed: Vec<String>,
    /// Messages queued for the QA channel.
    pub qa_messages: usize,
    /// Messages queued for maintainers' private channels.
    pub private_messages: usize,
    /// Channels delivered to.
    pub channels_sent: usize,
    /// Channels whose delivery failed.
    pub channels_failed: Vec<String>,
}

/// Run orchestrator: evaluates every rule, collects the outbox and
/// dispatches it.
pub struct TriageRun {
    config: TriageConfig,
    qa_channel: String,
    source: Box<dyn PullRequestSource>,
    nightly: Box<dyn NightlyReports>,
}

impl TriageRun {
    /// Create a run posting the QA report to `qa_channel`.
    pub fn new(
        config: TriageConfig,
        qa_channel: impl Into<String>,
        source: Box<dyn PullRequestSource>,
        nightly: Box<dyn NightlyReports>,
    ) -> Self {
        Self {
            config,
            qa_channel: qa_channel.into(),
            source,
            nightly,
        }
    }

    /// Evaluate the rules for `today` without sending anything.
    ///
    /// A failing rule is logged and skipped; it never aborts the run.
    pub async fn collect(&self, today: NaiveDate) -> RunResult {
        let ctx = RuleContext {
            config: &self.config,
            source: self.source.as_ref(),
            nightly: self.nightly.as_ref(),
            today,
        };
        let mut outbox = Outbox::new();
        let mut stats = RunStats::default();

        for rule in Rule::ALL {
            stats.rules_evaluated += 1;
            match rule.evaluate(&ctx).await {
                Ok(RuleOutput::Qa(text)) => {
                    outbox.push(self.qa_channel.as_str(), text);
                    stats.qa_messages += 1;
                }
                Ok(RuleOutput::Maintainers(messages)) => {
                    tracing::debug!(%rule, count = messages.len(), "private messages");
                    for message in messages {
                        outbox.push(message.maintainer.slack, message.text);
                        stats.private_messages += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(%rule, error = %e, "rule failed, skipping its messages");
                    stats.rules_failed.push(rule.to_string());
                }
            }
        }

        RunResult { outbox, stats }
    }

    /// Evaluate the rules for `today` and deliver the outbox.
    ///
    /// Delivery failures are logged per channel; remaining channels are
    /// still sent.
    pub async fn run(&self, today: NaiveDate, notifier: &dyn Notifier) -> RunResult {
        let mut result = self.collect(today).await;
        dispatch(&result.outbox, notifier, &mut result.stats).await;
        result
    }
}

async fn dispatch(outbox: &Outbox, notifier: &dyn Notifier, stats: &mut RunStats) {
    for (channel, text) in outbox.blocks() {
        match notifier.send(channel, &text).await {
            Ok(()) => stats.channels_sent += 1,
            Err(e) => {
                tracing::warn!(%channel, error = %e, "delivery failed");
                stats.channels_failed.push(channel.to_string());
            }
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Triage Run")?;
        writeln!(f, "==========")?;
        writeln!(
            f,
            "Rules: {} (failed: {}) | Channels: {} | Sent: {} (failed: {})\n",
            self.stats.rules_evaluated,
            self.stats.rules_failed.len(),
            self.outbox.len(),
            self.stats.channels_sent,
            self.stats.channels_failed.len(),
        )?;

        if self.outbox.is_empty() {
            writeln!(f, "Nothing to send.")?;
        } else {
            for (channel, text) in self.outbox.blocks() {
                writeln!(f, "--- #{channel} ---")?;
                writeln!(f, "{text}")?;
            }
        }

        if !self.stats.rules_failed.is_empty() {
            writeln!(f, "Failed rules: {}", self.stats.rules_failed.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use prtriage_core::{LinkedIssue, Maintainer, PullRequest, TriageError};
    use std::sync::Mutex;

    use crate::source::NightlyReport;

    struct FailingSource;

    #[async_trait]
    impl PullRequestSource for FailingSource {
        async fn search(&self, _query: &str) -> Result<Vec<PullRequest>, TriageError> {
            Err(TriageError::GitHub("search unavailable".into()))
        }
        async fn count(&self, _query: &str) -> Result<u64, TriageError> {
            Err(TriageError::GitHub("search unavailable".into()))
        }
        async fn issue(&self, _number: u64) -> Result<LinkedIssue, TriageError> {
            Err(TriageError::GitHub("search unavailable".into()))
        }
        async fn branches(&self, _repository: &str) -> Result<Vec<String>, TriageError> {
            Err(TriageError::GitHub("search unavailable".into()))
        }
        async fn file_content(&self, _: &str, _: &str, _: &str) -> Result<String, TriageError> {
            Err(TriageError::GitHub("search unavailable".into()))
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

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
        reject: Option<String>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn send(&self, channel: &str, text: &str) -> Result<(), TriageError> {
            if self.reject.as_deref() == Some(channel) {
                return Err(TriageError::Slack("channel_not_found".into()));
            }
            self.sent.lock().unwrap().push((channel.into(), text.into()));
            Ok(())
        }
    }

    fn run_with_failing_source() -> TriageRun {
        let mut config = TriageConfig::default();
        config.team.maintainers = vec![Maintainer::new("alice", "U01")];
        TriageRun::new(config, "C-QA", Box::new(FailingSource), Box::new(NoReports))
    }

    // 2024-03-04 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[tokio::test]
    async fn failing_search_degrades_to_qa_titles_only() {
        let result = run_with_failing_source().collect(monday()).await;

        assert_eq!(result.stats.rules_evaluated, 7);
        assert_eq!(
            result.stats.rules_failed,
            vec![
                "qa_stats",
                "ready_to_test",
                "review_distribution",
                "naming_report",
                "merge_reminder",
            ]
        );
        assert_eq!(result.outbox.len(), 1);
        let qa = result.outbox.messages("C-QA");
        assert_eq!(qa.len(), 2);
        assert!(qa[0].contains("Welcome to the PrestHubot Report"));
        assert!(qa[1].contains("Nightly Board"));
    }

    #[tokio::test]
    async fn delivery_failure_is_counted_not_fatal() {
        let recorder = Recorder {
            reject: Some("C-QA".into()),
            ..Recorder::default()
        };
        let result = run_with_failing_source().run(monday(), &recorder).await;
        assert_eq!(result.stats.channels_failed, vec!["C-QA"]);
        assert_eq!(result.stats.channels_sent, 0);
        assert!(recorder.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn display_lists_channels() {
        let result = run_with_failing_source().collect(monday()).await;
        let text = result.to_string();
        assert!(text.contains("--- #C-QA ---"));
        assert!(text.contains("Failed rules: qa_stats"));
    }
}
