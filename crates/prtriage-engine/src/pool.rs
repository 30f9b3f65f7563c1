//! The ordered set of maintainers eligible for assigned work.

use prtriage_core::{Maintainer, TeamConfig};

/// Maintainers eligible for assignment, in roster order, lead excluded.
///
/// # Examples
///
/// ```
/// use prtriage_core::{Maintainer, TeamConfig};
/// use prtriage_engine::pool::MaintainerPool;
///
/// let team = TeamConfig {
///     lead: Some("boss".into()),
///     maintainers: vec![
///         Maintainer::new("alice", "U01"),
///         Maintainer::new("boss", "U00"),
///         Maintainer::new("bob", "U02"),
///     ],
///     ..TeamConfig::default()
/// };
/// let pool = MaintainerPool::from_team(&team);
/// let logins: Vec<_> = pool.iter().map(|m| m.github.as_str()).collect();
/// assert_eq!(logins, vec!["alice", "bob"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintainerPool {
    members: Vec<Maintainer>,
}

impl MaintainerPool {
    /// Build the pool from a roster, dropping `lead` and duplicate logins.
    pub fn new(maintainers: impl IntoIterator<Item = Maintainer>, lead: Option<&str>) -> Self {
        let mut members: Vec<Maintainer> = Vec::new();
        for maintainer in maintainers {
            if lead == Some(maintainer.github.as_str()) {
                continue;
            }
            if members.iter().any(|m| m.github == maintainer.github) {
                continue;
            }
            members.push(maintainer);
        }
        Self { members }
    }

    /// Pool of the configured team.
    pub fn from_team(team: &TeamConfig) -> Self {
        Self::new(team.maintainers.iter().cloned(), team.lead.as_deref())
    }

    /// Members in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = &Maintainer> {
        self.members.iter()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` when nobody can be assigned work.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `true` when `login` is a member.
    pub fn contains(&self, login: &str) -> bool {
        self.members.iter().any(|m| m.github == login)
    }
}

impl<'a> IntoIterator for &'a MaintainerPool {
    type Item = &'a Maintainer;
    type IntoIter = std::slice::Iter<'a, Maintainer>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Maintainer> {
        vec![
            Maintainer::new("alice", "U01"),
            Maintainer::new("bob", "U02"),
            Maintainer::new("carol", "U03"),
        ]
    }

    #[test]
    fn lead_is_never_a_member() {
        let pool = MaintainerPool::new(roster(), Some("bob"));
        assert_eq!(pool.len(), 2);
        assert!(!pool.contains("bob"));
        assert!(pool.contains("alice"));
    }

    #[test]
    fn no_lead_keeps_everyone_in_order() {
        let pool = MaintainerPool::new(roster(), None);
        let logins: Vec<_> = pool.iter().map(|m| m.github.clone()).collect();
        assert_eq!(logins, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn duplicate_logins_collapse_to_first() {
        let mut maintainers = roster();
        maintainers.push(Maintainer::new("alice", "U99"));
        let pool = MaintainerPool::new(maintainers, None);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.iter().next().map(|m| m.slack.as_str()), Some("U01"));
    }

    #[test]
    fn empty_roster() {
        let pool = MaintainerPool::from_team(&TeamConfig::default());
        assert!(pool.is_empty());
    }
}
