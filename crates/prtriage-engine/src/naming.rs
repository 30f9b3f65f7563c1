//! Naming and description-format checks for merged pull requests.
//!
//! Pull request bodies carry a Markdown table (`| Category? | BO |`,
//! `| Type? | bug fix |`, ...). The checker reads the fields it knows about
//! through an ordered list of extraction rules and reports every problem it
//! finds; a parse miss is a violation, never an error.

use std::collections::BTreeSet;
use std::fmt;

use prtriage_core::{NamingConfig, PullRequest, TriageError};
use regex::Regex;
use serde::Serialize;

/// One reason a pull request fails the naming rules.
///
/// Variants are declared in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    /// Category code missing or not accepted.
    InvalidCategory,
    /// Change type missing or not accepted.
    InvalidType,
    /// Title does not start with an uppercase letter.
    TitleFormat,
    /// No milestone set.
    NoMilestone,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::InvalidCategory => write!(f, "Invalid category"),
            Violation::InvalidType => write!(f, "Invalid type"),
            Violation::TitleFormat => {
                write!(f, "Pull Request title does not start with an uppercase letter")
            }
            Violation::NoMilestone => write!(f, "No milestone defined"),
        }
    }
}

/// Metadata read from a pull request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyFields {
    /// Upper-cased two-letter category code.
    pub category: Option<String>,
    /// Lower-cased, trimmed change type.
    pub change_type: Option<String>,
}

/// A named body field and the pattern capturing its value.
#[derive(Debug, Clone)]
struct FieldRule {
    field: Field,
    pattern: Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Category,
    Type,
}

fn table_row_pattern(property: &str, capture: &str) -> String {
    format!(r"(?im)^(?:\s*\|?\s*){property}\??\s*\|\s*(?P<value>{capture})(?:\s*\|?\s*)$")
}

/// Validates pull requests against the accepted categories and types.
///
/// # Examples
///
/// ```
/// use prtriage_core::{NamingConfig, PullRequest};
/// use prtriage_engine::naming::{NamingChecker, Violation};
///
/// let checker = NamingChecker::new(&NamingConfig::default()).unwrap();
///
/// let mut pr = PullRequest::new("PrestaShop", 1, "Fix the cart");
/// pr.body = "| Category? | BO\n| Type? | bug fix\n".into();
/// pr.milestone = Some("8.1.0".into());
/// assert!(checker.validate(&pr).is_empty());
///
/// pr.title = "fix the cart".into();
/// assert_eq!(checker.validate(&pr), vec![Violation::TitleFormat]);
/// ```
#[derive(Debug, Clone)]
pub struct NamingChecker {
    rules: Vec<FieldRule>,
    categories: BTreeSet<String>,
    types: BTreeSet<String>,
}

impl NamingChecker {
    /// Build a checker from the accepted values.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] if a field pattern cannot be compiled.
    pub fn new(config: &NamingConfig) -> Result<Self, TriageError> {
        let specs = [
            (Field::Category, table_row_pattern("Category", "[a-z]{2}")),
            (Field::Type, table_row_pattern("Type", r"[a-zA-Z\s]+")),
        ];
        let rules = specs
            .into_iter()
            .map(|(field, pattern)| {
                Regex::new(&pattern)
                    .map(|pattern| FieldRule { field, pattern })
                    .map_err(|e| TriageError::Config(format!("invalid field pattern: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            categories: config.categories.keys().map(|c| c.to_uppercase()).collect(),
            types: config.types.iter().map(|t| t.to_lowercase()).collect(),
        })
    }

    /// Read the known fields from a pull request body.
    ///
    /// # Examples
    ///
    /// ```
    /// use prtriage_core::NamingConfig;
    /// use prtriage_engine::naming::NamingChecker;
    ///
    /// let checker = NamingChecker::new(&NamingConfig::default()).unwrap();
    /// let fields = checker.parse_body("| Type?  | New Feature |\n| Category? | fo |");
    /// assert_eq!(fields.category.as_deref(), Some("FO"));
    /// assert_eq!(fields.change_type.as_deref(), Some("new feature"));
    /// ```
    pub fn parse_body(&self, body: &str) -> BodyFields {
        let mut fields = BodyFields::default();
        for rule in &self.rules {
            let Some(value) = rule
                .pattern
                .captures(body)
                .and_then(|c| c.name("value"))
                .map(|m| m.as_str())
            else {
                continue;
            };
            match rule.field {
                Field::Category => fields.category = Some(value.trim().to_uppercase()),
                Field::Type => fields.change_type = Some(value.trim().to_lowercase()),
            }
        }
        fields
    }

    /// Every violation of `pr`, in reporting order. Empty means compliant.
    pub fn validate(&self, pr: &PullRequest) -> Vec<Violation> {
        let fields = self.parse_body(&pr.body);
        let mut violations = Vec::new();

        if !fields
            .category
            .as_ref()
            .is_some_and(|c| self.categories.contains(c))
        {
            violations.push(Violation::InvalidCategory);
        }
        if !fields
            .change_type
            .as_ref()
            .is_some_and(|t| self.types.contains(t))
        {
            violations.push(Violation::InvalidType);
        }
        if pr.title.chars().next().is_some_and(|c| !c.is_ascii_uppercase()) {
            violations.push(Violation::TitleFormat);
        }
        if pr.milestone.as_deref().map_or(true, str::is_empty) {
            violations.push(Violation::NoMilestone);
        }

        violations
    }
}
