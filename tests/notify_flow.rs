use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use prtriage_core::{LinkedIssue, Maintainer, PullRequest, TriageConfig, TriageError};
use prtriage_engine::run::TriageRun;
use prtriage_engine::source::{
    NightlyReport, NightlyReports, NightlyTests, Notifier, PullRequestSource,
};

const BODY: &str = "\
| Questions         | Answers
| ----------------- | -------------------------------------------------------
| Branch?           | develop
| Description?      | Fix the thing
| Type?             | bug fix
| Category?         | BO
| Fixed ticket?     | Fixes #100
";

fn pr(repository: &str, number: u64, title: &str, created: &str) -> PullRequest {
    let mut pr = PullRequest::new(repository, number, title);
    pr.author = "dave".into();
    pr.created_at = DateTime::parse_from_rfc3339(created)
        .unwrap()
        .with_timezone(&Utc);
    pr
}

/// Answers searches by the shape of the query.
struct Fixture;

impl Fixture {
    fn waiting_for_qa() -> Vec<PullRequest> {
        let mut must_have = pr("PrestaShop", 10, "Fix cart rules", "2024-02-10T10:00:00Z");
        must_have.body = BODY.into();
        must_have.milestone = Some("8.1.0".into());
        let next = pr("PrestaShop", 11, "Add a hook", "2024-01-01T10:00:00Z");
        let module = pr("ps_banner", 3, "Fix banner upload", "2023-12-01T10:00:00Z");
        let specs = pr("prestashop-specs", 5, "Document hooks", "2023-11-01T10:00:00Z");
        vec![module, specs, next, must_have]
    }

    fn waiting_for_review() -> Vec<PullRequest> {
        let mut approved = pr("PrestaShop", 20, "Refactor the kernel", "2024-02-01T10:00:00Z");
        approved.author = "alice".into();
        approved.approvals = vec!["bob".into()];
        let fresh = pr("PrestaShop", 21, "Improve search", "2024-02-02T10:00:00Z");
        let mut private = pr("ps_secret", 2, "Secret fix", "2024-02-03T10:00:00Z");
        private.repository_private = true;
        vec![fresh, private, approved]
    }

    fn merged() -> Vec<PullRequest> {
        let sloppy = pr("PrestaShop", 30, "fix typo", "2024-03-01T10:00:00Z");
        let mut clean = pr("PrestaShop", 31, "Fix the thing", "2024-03-01T11:00:00Z");
        clean.body = BODY.into();
        clean.milestone = Some("8.1.0".into());
        vec![sloppy, clean]
    }
}

#[async_trait]
impl PullRequestSource for Fixture {
    async fn search(&self, query: &str) -> Result<Vec<PullRequest>, TriageError> {
        if query.contains("is:merged") {
            Ok(Self::merged())
        } else if query.contains(r#" label:"waiting for QA""#) {
            Ok(Self::waiting_for_qa())
        } else {
            Ok(Self::waiting_for_review())
        }
    }

    async fn count(&self, _query: &str) -> Result<u64, TriageError> {
        Ok(4)
    }

    async fn issue(&self, number: u64) -> Result<LinkedIssue, TriageError> {
        Ok(LinkedIssue::new(number).with_label("Must-have"))
    }

    async fn branches(&self, _repository: &str) -> Result<Vec<String>, TriageError> {
        Ok(vec![
            "1.7.8.x".into(),
            "8.0.x".into(),
            "8.1.x".into(),
            "develop".into(),
        ])
    }

    async fn file_content(&self, _: &str, _: &str, _: &str) -> Result<String, TriageError> {
        Ok("class AppKernel\n{\n    const VERSION = '9.0.0';\n}\n".into())
    }
}

struct Board;

#[async_trait]
impl NightlyReports for Board {
    async fn report(
        &self,
        _date: NaiveDate,
        branch: &str,
        campaign: &str,
    ) -> Result<Option<NightlyReport>, TriageError> {
        if branch != "8.0.x" || campaign != "functional" {
            return Ok(None);
        }
        Ok(Some(NightlyReport {
            id: 77,
            start_date: DateTime::parse_from_rfc3339("2024-03-04T02:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            end_date: DateTime::parse_from_rfc3339("2024-03-04T03:05:09Z")
                .unwrap()
                .with_timezone(&Utc),
            tests: Some(NightlyTests {
                passed: Some(1200),
                failed: Some(0),
                pending: Some(2),
            }),
        }))
    }
}

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for Recorder {
    async fn send(&self, channel: &str, text: &str) -> Result<(), TriageError> {
        self.sent.lock().unwrap().push((channel.into(), text.into()));
        Ok(())
    }
}

fn triage_run() -> TriageRun {
    let mut config = TriageConfig::default();
    config.team.lead = Some("lead".into());
    config.team.maintainers = vec![
        Maintainer::new("lead", "U00"),
        Maintainer::new("alice", "U01"),
        Maintainer::new("bob", "U02"),
        Maintainer::new("carol", "U03"),
    ];
    TriageRun::new(config, "C-QA", Box::new(Fixture), Box::new(Board))
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

#[tokio::test]
async fn every_rule_succeeds_on_monday() {
    let result = triage_run().collect(monday()).await;

    assert_eq!(result.stats.rules_evaluated, 7);
    assert!(result.stats.rules_failed.is_empty(), "{:?}", result.stats.rules_failed);
    assert_eq!(result.stats.qa_messages, 4);

    let channels: Vec<&str> = result.outbox.blocks().map(|(channel, _)| channel).collect();
    assert_eq!(channels, vec!["C-QA", "U01", "U02", "U03"]);
}

#[tokio::test]
async fn qa_channel_gets_report_in_order() {
    let result = triage_run().collect(monday()).await;
    let qa = result.outbox.messages("C-QA");

    assert!(qa[0].contains("Welcome to the PrestHubot Report"));
    assert!(qa[1].contains(
        " - <https://nightly.prestashop.com/report/77|:greenlight: Report -8.0.x(functional)> : \
         :heavy_check_mark: 1200 - :x: 0 - ⏸️ 2 - :timer_clock: 01h 05m 09s\n"
    ));
    assert!(qa[2].contains("|PR develop> : *4*"));
    assert!(qa[2].contains("|PR Blocked> : *4*"));
}

#[tokio::test]
async fn ready_to_test_queue_is_ranked_and_grouped() {
    let result = triage_run().collect(monday()).await;
    let queue = &result.outbox.messages("C-QA")[3];

    assert!(queue.starts_with(":eyes: PR Ready to Test *(3)* :eyes:\n"));
    assert!(!queue.contains("prestashop-specs#5"));
    assert!(queue.contains(" - *[8.1.0]* *_[Must Have]_* <"));
    assert!(queue.contains(" - *[9.0.0]* <"));
    assert!(queue.contains(" - *[Modules]* <"));

    let first = queue.find("PrestaShop#10").unwrap();
    let second = queue.find("PrestaShop#11").unwrap();
    let third = queue.find("ps_banner#3").unwrap();
    assert!(first < second && second < third);
}

#[tokio::test]
async fn reviews_skip_author_approvers_and_private_repositories() {
    let result = triage_run().collect(monday()).await;

    let alice = result.outbox.messages("U01").join("\n");
    let bob = result.outbox.messages("U02").join("\n");
    let carol = result.outbox.messages("U03").join("\n");

    assert!(carol.contains("PrestaShop#20"));
    assert!(carol.contains(":heavy_check_mark: <@U02>"));
    assert!(!alice.contains("PrestaShop#20"));
    assert!(!bob.contains("PrestaShop#20"));
    assert!(alice.contains("PrestaShop#21"));
    assert!(bob.contains("PrestaShop#21"));
    assert!(!format!("{alice}{bob}{carol}").contains("ps_secret"));
}

#[tokio::test]
async fn lead_receives_nothing() {
    let result = triage_run().collect(monday()).await;
    assert!(result.outbox.messages("U00").is_empty());
}

#[tokio::test]
async fn naming_violations_go_to_first_maintainer() {
    let result = triage_run().collect(monday()).await;
    let alice = result.outbox.messages("U01");

    let naming = alice
        .iter()
        .find(|m| m.contains("Could you fix these PRs"))
        .unwrap();
    assert!(naming.contains("PrestaShop#30"));
    assert!(!naming.contains("PrestaShop#31"));
    assert!(naming.contains(":red_circle:"));
}

#[tokio::test]
async fn merge_reminder_only_on_monday() {
    let reminder = "Don't forget to merge `8.1.x` in `develop`!";

    let monday = triage_run().collect(monday()).await;
    for channel in ["U01", "U02", "U03"] {
        assert!(
            monday.outbox.messages(channel).iter().any(|m| m.contains(reminder)),
            "{channel} missed the reminder"
        );
    }

    let tuesday = triage_run().collect(tuesday()).await;
    assert!(tuesday.stats.rules_failed.is_empty());
    assert!(!tuesday
        .outbox
        .messages("U01")
        .iter()
        .any(|m| m.contains(reminder)));
}

#[tokio::test]
async fn run_delivers_one_block_per_channel() {
    let recorder = Recorder::default();
    let result = triage_run().run(monday(), &recorder).await;

    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent.len(), 4);
    assert_eq!(result.stats.channels_sent, 4);
    assert!(result.stats.channels_failed.is_empty());

    let (channel, alice) = &sent[1];
    assert_eq!(channel, "U01");
    assert_eq!(alice.matches(":pray:").count(), 4);
}
