//! Greedy round-robin distribution of work items across a maintainer pool.
//!
//! Items are taken in input order and members in pool order. An item goes to
//! the first `per_item` members that are neither full nor excluded for it.
//! The allocator knows nothing about pull requests or message formatting;
//! the exclusion predicate carries the rule-specific constraints.

use prtriage_core::Maintainer;
use serde::Serialize;

use crate::pool::MaintainerPool;

/// Allocation policy: per-maintainer quota and members per item.
///
/// # Examples
///
/// ```
/// use prtriage_core::Maintainer;
/// use prtriage_engine::allocator::Allocator;
/// use prtriage_engine::pool::MaintainerPool;
///
/// let pool = MaintainerPool::new(
///     [Maintainer::new("alice", "U01"), Maintainer::new("bob", "U02")],
///     None,
/// );
/// let result = Allocator::new(1, 1).assign(["a", "b", "c"], &pool, |_, _| false);
/// assert_eq!(result.items_of("alice"), Some(&["a"][..]));
/// assert_eq!(result.items_of("bob"), Some(&["b"][..]));
/// assert_eq!(result.unassigned, vec!["c"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocator {
    quota: usize,
    per_item: usize,
}

impl Allocator {
    /// Each member takes at most `quota` items; each item goes to at most
    /// `per_item` members.
    pub fn new(quota: usize, per_item: usize) -> Self {
        Self { quota, per_item }
    }

    /// Distribute `items` over `pool`.
    ///
    /// `exclude(member, item)` returning `true` disqualifies `member` for
    /// `item`. Items no member could take are returned in
    /// [`Assignment::unassigned`], in input order.
    pub fn assign<T, I, F>(&self, items: I, pool: &MaintainerPool, exclude: F) -> Assignment<T>
    where
        T: Clone,
        I: IntoIterator<Item = T>,
        F: Fn(&Maintainer, &T) -> bool,
    {
        let mut table: Vec<(Maintainer, Vec<T>)> =
            pool.iter().map(|m| (m.clone(), Vec::new())).collect();
        let mut unassigned = Vec::new();
        let mut items = items.into_iter();

        for item in items.by_ref() {
            if table.iter().all(|(_, assigned)| assigned.len() >= self.quota) {
                unassigned.push(item);
                break;
            }

            let mut taken = 0;
            for (member, assigned) in table.iter_mut() {
                if taken >= self.per_item {
                    break;
                }
                if assigned.len() >= self.quota || exclude(member, &item) {
                    continue;
                }
                assigned.push(item.clone());
                taken += 1;
            }
            if taken == 0 {
                unassigned.push(item);
            }
        }
        unassigned.extend(items);

        Assignment { table, unassigned }
    }
}

/// Result of one allocation: every pool member with their items, in pool
/// order, plus the items nobody took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment<T> {
    /// Pool members and their assigned items, in pool order.
    pub table: Vec<(Maintainer, Vec<T>)>,
    /// Items assigned to no member.
    pub unassigned: Vec<T>,
}

impl<T> Assignment<T> {
    /// Items of the member with login `login`, if they are in the pool.
    pub fn items_of(&self, login: &str) -> Option<&[T]> {
        self.table
            .iter()
            .find(|(m, _)| m.github == login)
            .map(|(_, items)| items.as_slice())
    }

    /// Members holding at least one item, in pool order.
    pub fn non_empty(&self) -> impl Iterator<Item = (&Maintainer, &[T])> {
        self.table
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(m, items)| (m, items.as_slice()))
    }

    /// Total number of (member, item) pairs.
    pub fn assigned_count(&self) -> usize {
        self.table.iter().map(|(_, items)| items.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prtriage_core::PullRequest;

    fn pool(logins: &[&str], lead: Option<&str>) -> MaintainerPool {
        MaintainerPool::new(
            logins
                .iter()
                .enumerate()
                .map(|(i, l)| Maintainer::new(*l, format!("U{i:02}"))),
            lead,
        )
    }

    fn review_exclusion(member: &Maintainer, pr: &&PullRequest) -> bool {
        pr.author == member.github || pr.is_approved_by(&member.github)
    }

    #[test]
    fn quota_is_never_exceeded() {
        let pool = pool(&["a", "b"], None);
        let items: Vec<u32> = (0..20).collect();
        let result = Allocator::new(3, 2).assign(items, &pool, |_, _| false);
        for (_, assigned) in &result.table {
            assert!(assigned.len() <= 3);
        }
        assert_eq!(result.assigned_count(), 6);
        assert_eq!(result.unassigned, (3..20).collect::<Vec<_>>());
    }

    #[test]
    fn every_member_appears_even_without_items() {
        let pool = pool(&["a", "b", "c"], None);
        let result = Allocator::new(5, 1).assign(["x"], &pool, |_, _| false);
        assert_eq!(result.table.len(), 3);
        assert_eq!(result.non_empty().count(), 1);
    }

    #[test]
    fn excluded_members_are_skipped() {
        let pool = pool(&["a", "b", "c"], None);
        let result = Allocator::new(5, 1).assign(["x", "y"], &pool, |m, item| {
            m.github == "a" && *item == "x"
        });
        assert_eq!(result.items_of("b"), Some(&["x"][..]));
        assert_eq!(result.items_of("a"), Some(&["y"][..]));
    }

    #[test]
    fn item_nobody_can_take_is_reported() {
        let pool = pool(&["a"], None);
        let result = Allocator::new(5, 2).assign(["x", "y"], &pool, |_, item| *item == "x");
        assert_eq!(result.unassigned, vec!["x"]);
        assert_eq!(result.items_of("a"), Some(&["y"][..]));
    }

    #[test]
    fn saturation_exit_does_not_change_result() {
        let pool = pool(&["a", "b"], None);
        let allocator = Allocator::new(1, 1);
        let saturated = allocator.assign(0..10, &pool, |_, _| false);
        let short = allocator.assign(0..2, &pool, |_, _| false);
        assert_eq!(saturated.table, short.table);
        assert_eq!(saturated.unassigned, (2..10).collect::<Vec<_>>());
    }

    #[test]
    fn seven_pull_requests_over_four_maintainers() {
        let pool = pool(&["lead", "m1", "m2", "m3", "m4"], Some("lead"));
        assert_eq!(pool.len(), 4);

        let mut prs = Vec::new();
        for n in 1..=7u64 {
            let mut pr = PullRequest::new("PrestaShop", n, format!("PR {n}"));
            pr.author = match n {
                1 => "m1",
                2 => "m2",
                3 => "lead",
                _ => "contributor",
            }
            .to_string();
            if n == 4 {
                pr.approvals = vec!["m1".into(), "m2".into()];
            }
            if n == 5 {
                pr.approvals = vec!["m3".into()];
            }
            prs.push(pr);
        }

        let result = Allocator::new(5, 2).assign(prs.iter(), &pool, review_exclusion);

        assert!(result.items_of("lead").is_none());
        for (member, assigned) in &result.table {
            assert!(assigned.len() <= 5, "{} over quota", member.github);
            for pr in assigned {
                assert_ne!(pr.author, member.github);
                assert!(!pr.is_approved_by(&member.github));
            }
        }
        for pr in &prs {
            let reviewers = result
                .table
                .iter()
                .filter(|(_, items)| items.iter().any(|i| i.number == pr.number))
                .count();
            assert!(reviewers <= 2);
        }
        assert_eq!(result.assigned_count(), 14);
        assert!(result.unassigned.is_empty());

        let pr4: Vec<_> = result
            .table
            .iter()
            .filter(|(_, items)| items.iter().any(|i| i.number == 4))
            .map(|(m, _)| m.github.as_str())
            .collect();
        assert_eq!(pr4, vec!["m3", "m4"]);
    }
}
