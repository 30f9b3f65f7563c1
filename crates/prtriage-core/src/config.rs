use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TriageError;
use crate::types::Maintainer;

/// Top-level configuration loaded from `.prtriage.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
/// Every table the rules consult (accepted categories, types, branches, the
/// maintainer roster) lives here so tests can substitute fixtures.
///
/// # Examples
///
/// ```
/// use prtriage_core::TriageConfig;
///
/// let config = TriageConfig::default();
/// assert_eq!(config.team.quota, 5);
/// assert_eq!(config.github.core_repository, "PrestaShop");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Code-hosting scope settings.
    #[serde(default)]
    pub github: GithubConfig,
    /// Chat platform settings.
    #[serde(default)]
    pub slack: SlackConfig,
    /// Maintainer roster and assignment quotas.
    #[serde(default)]
    pub team: TeamConfig,
    /// Accepted pull request metadata values.
    #[serde(default)]
    pub naming: NamingConfig,
    /// QA queue and statistics settings.
    #[serde(default)]
    pub qa: QaConfig,
    /// Nightly report board settings.
    #[serde(default)]
    pub nightly: NightlyConfig,
}

impl TriageConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::FileNotFound`] if `path` does not exist,
    /// [`TriageError::Io`] if the file cannot be read, or
    /// [`TriageError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use prtriage_core::TriageConfig;
    /// use std::path::Path;
    ///
    /// let config = TriageConfig::from_file(Path::new(".prtriage.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, TriageError> {
        if !path.exists() {
            return Err(TriageError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use prtriage_core::TriageConfig;
    ///
    /// let toml = r#"
    /// [team]
    /// quota = 3
    /// "#;
    /// let config = TriageConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.team.quota, 3);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, TriageError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Code-hosting scope: organization, the designated core repository and
/// where the next release version is read from.
///
/// # Examples
///
/// ```
/// use prtriage_core::GithubConfig;
///
/// let config = GithubConfig::default();
/// assert_eq!(config.organization, "PrestaShop");
/// assert_eq!(config.develop_branch, "develop");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Organization every search is scoped to.
    #[serde(default = "default_organization")]
    pub organization: String,
    /// Repository that sorts before all others in the QA queue.
    #[serde(default = "default_core_repository")]
    pub core_repository: String,
    /// Repository holding specifications; excluded from review and QA rules.
    #[serde(default = "default_specs_repository")]
    pub specs_repository: String,
    /// Integration branch of the core repository.
    #[serde(default = "default_develop_branch")]
    pub develop_branch: String,
    /// File on the develop branch declaring `const VERSION = '...'`.
    #[serde(default = "default_version_file")]
    pub version_file: String,
    /// API token. Falls back to `GH_TOKEN` / `GITHUB_TOKEN`.
    pub token: Option<String>,
}

fn default_organization() -> String {
    "PrestaShop".into()
}

fn default_core_repository() -> String {
    "PrestaShop".into()
}

fn default_specs_repository() -> String {
    "prestashop-specs".into()
}

fn default_develop_branch() -> String {
    "develop".into()
}

fn default_version_file() -> String {
    "app/AppKernel.php".into()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            core_repository: default_core_repository(),
            specs_repository: default_specs_repository(),
            develop_branch: default_develop_branch(),
            version_file: default_version_file(),
            token: None,
        }
    }
}

/// Chat platform configuration.
///
/// # Examples
///
/// ```
/// use prtriage_core::SlackConfig;
///
/// let config = SlackConfig::default();
/// assert_eq!(config.api_base_url, "https://slack.com/api");
/// assert!(config.qa_channel.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token. Falls back to `SLACK_TOKEN`.
    pub token: Option<String>,
    /// Channel receiving the QA report. Falls back to `SLACK_CHANNEL_QA`.
    pub qa_channel: Option<String>,
    /// Base URL of the Web API.
    #[serde(default = "default_slack_api")]
    pub api_base_url: String,
}

fn default_slack_api() -> String {
    "https://slack.com/api".into()
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: None,
            qa_channel: None,
            api_base_url: default_slack_api(),
        }
    }
}

/// Maintainer roster and assignment limits.
///
/// # Examples
///
/// ```
/// use prtriage_core::TeamConfig;
///
/// let config = TeamConfig::default();
/// assert_eq!(config.quota, 5);
/// assert_eq!(config.reviewers_per_pull_request, 2);
/// assert!(config.maintainers.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    /// GitHub login of the lead maintainer, never assigned work.
    pub lead: Option<String>,
    /// Maximum items per maintainer per rule (default: 5).
    #[serde(default = "default_quota")]
    pub quota: usize,
    /// Reviewers assigned to each pull request awaiting review (default: 2).
    #[serde(default = "default_reviewers_per_pull_request")]
    pub reviewers_per_pull_request: usize,
    /// Ordered roster; order decides round-robin precedence.
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
}

fn default_quota() -> usize {
    5
}

fn default_reviewers_per_pull_request() -> usize {
    2
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            lead: None,
            quota: default_quota(),
            reviewers_per_pull_request: default_reviewers_per_pull_request(),
            maintainers: Vec::new(),
        }
    }
}

/// Accepted values for the structured pull request description.
///
/// # Examples
///
/// ```
/// use prtriage_core::NamingConfig;
///
/// let config = NamingConfig::default();
/// assert!(config.categories.contains_key("BO"));
/// assert!(config.types.iter().any(|t| t == "bug fix"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Two-letter category code to its label.
    #[serde(default = "default_categories")]
    pub categories: BTreeMap<String, String>,
    /// Lower-case change types.
    #[serde(default = "default_types")]
    pub types: Vec<String>,
}

fn default_categories() -> BTreeMap<String, String> {
    [
        ("FO", "Front office"),
        ("CO", "Core"),
        ("BO", "Back office"),
        ("WS", "Web services"),
        ("IN", "Installer"),
        ("TE", "Tests"),
        ("LO", "Localization"),
        ("ME", "Merge"),
        ("PM", "Project management"),
    ]
    .into_iter()
    .map(|(code, label)| (code.to_string(), label.to_string()))
    .collect()
}

fn default_types() -> Vec<String> {
    ["bug fix", "improvement", "refacto", "new feature"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            types: default_types(),
        }
    }
}

/// QA queue and statistics settings.
///
/// # Examples
///
/// ```
/// use prtriage_core::QaConfig;
///
/// let config = QaConfig::default();
/// assert_eq!(config.milestone_group_size, 3);
/// assert_eq!(config.branches, vec!["1.7.8.x", "8.0.x", "develop"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaConfig {
    /// Maintained branches of the core repository.
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,
    /// Nightly test campaigns reported per branch.
    #[serde(default = "default_campaigns")]
    pub campaigns: Vec<String>,
    /// Items shown before a visual break inside one milestone (default: 3).
    #[serde(default = "default_milestone_group_size")]
    pub milestone_group_size: usize,
}

fn default_branches() -> Vec<String> {
    ["1.7.8.x", "8.0.x", "develop"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_campaigns() -> Vec<String> {
    ["functional", "autoupgrade"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_milestone_group_size() -> usize {
    3
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            branches: default_branches(),
            campaigns: default_campaigns(),
            milestone_group_size: default_milestone_group_size(),
        }
    }
}

/// Nightly report board endpoints.
///
/// # Examples
///
/// ```
/// use prtriage_core::NightlyConfig;
///
/// let config = NightlyConfig::default();
/// assert!(config.api_url.starts_with("https://"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NightlyConfig {
    /// JSON API listing reports.
    #[serde(default = "default_nightly_api")]
    pub api_url: String,
    /// Human-facing report page; the report id is appended.
    #[serde(default = "default_nightly_report")]
    pub report_url: String,
}

fn default_nightly_api() -> String {
    "https://api-nightly.prestashop.com".into()
}

fn default_nightly_report() -> String {
    "https://nightly.prestashop.com/report".into()
}

impl Default for NightlyConfig {
    fn default() -> Self {
        Self {
            api_url: default_nightly_api(),
            report_url: default_nightly_report(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = TriageConfig::default();
        assert_eq!(config.team.quota, 5);
        assert_eq!(config.team.reviewers_per_pull_request, 2);
        assert!(config.team.lead.is_none());
        assert_eq!(config.github.organization, "PrestaShop");
        assert_eq!(config.github.specs_repository, "prestashop-specs");
        assert_eq!(config.naming.categories.len(), 9);
        assert_eq!(config.naming.types.len(), 4);
        assert_eq!(config.qa.campaigns, vec!["functional", "autoupgrade"]);
        assert_eq!(config.slack.api_base_url, "https://slack.com/api");
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let path = Path::new("/nonexistent/dir/.prtriage.toml");
        let err = TriageConfig::from_file(path).unwrap_err();
        assert!(matches!(err, TriageError::FileNotFound(ref p) if p == path));
        assert!(err.to_string().contains("/nonexistent/dir/.prtriage.toml"));
    }

    #[test]
    fn parse_team_roster() {
        let toml = r#"
[team]
lead = "boss"
quota = 4

[[team.maintainers]]
github = "alice"
slack = "U01"

[[team.maintainers]]
github = "bob"
slack = "U02"
"#;
        let config = TriageConfig::from_toml(toml).unwrap();
        assert_eq!(config.team.lead.as_deref(), Some("boss"));
        assert_eq!(config.team.quota, 4);
        assert_eq!(config.team.reviewers_per_pull_request, 2);
        assert_eq!(config.team.maintainers.len(), 2);
        assert_eq!(config.team.maintainers[1].github, "bob");
        assert_eq!(config.team.maintainers[1].slack, "U02");
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[github]
organization = "acme"
core_repository = "platform"
version_file = "VERSION.php"

[slack]
qa_channel = "C123"

[naming]
types = ["fix"]

[naming.categories]
XX = "Anything"

[qa]
branches = ["main"]
milestone_group_size = 5

[nightly]
api_url = "http://localhost:9000"
"#;
        let config = TriageConfig::from_toml(toml).unwrap();
        assert_eq!(config.github.organization, "acme");
        assert_eq!(config.github.core_repository, "platform");
        assert_eq!(config.github.develop_branch, "develop");
        assert_eq!(config.slack.qa_channel.as_deref(), Some("C123"));
        assert_eq!(config.naming.types, vec!["fix"]);
        assert_eq!(config.naming.categories.len(), 1);
        assert_eq!(config.qa.branches, vec!["main"]);
        assert_eq!(config.qa.milestone_group_size, 5);
        assert_eq!(config.qa.campaigns.len(), 2);
        assert_eq!(config.nightly.api_url, "http://localhost:9000");
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = TriageConfig::from_toml("").unwrap();
        assert_eq!(config.team.quota, 5);
        assert_eq!(config.qa.milestone_group_size, 3);
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = TriageConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }
}
