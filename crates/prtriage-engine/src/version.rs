//! Release version helpers: the upcoming version declared on the integration
//! branch and the newest maintenance branch.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static VERSION_CONSTANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"const VERSION = '([0-9.]+)'").expect("VERSION_CONSTANT regex should compile")
});

/// Version declared by `const VERSION = '...'` in `content`.
///
/// # Examples
///
/// ```
/// use prtriage_engine::version::declared_version;
///
/// let kernel = "class AppKernel {\n    const VERSION = '8.1.0';\n}";
/// assert_eq!(declared_version(kernel), Some("8.1.0"));
/// assert_eq!(declared_version("<?php"), None);
/// ```
pub fn declared_version(content: &str) -> Option<&str> {
    VERSION_CONSTANT
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Numeric components of a maintenance branch name such as `8.0.x` or
/// `1.7.8.x`. The wildcard component is dropped. Other names yield `None`.
fn branch_components(name: &str) -> Option<Vec<u64>> {
    let trimmed = name.strip_suffix(".x").unwrap_or(name);
    if trimmed.is_empty() {
        return None;
    }
    trimmed.split('.').map(|part| part.parse().ok()).collect()
}

/// Compare two version-like names component by component, numerically.
/// A name that is a prefix of the other sorts first.
fn compare_components(a: &[u64], b: &[u64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/// Newest version-like branch among `branches`.
///
/// Non-version names (`develop`, feature branches) are ignored.
///
/// # Examples
///
/// ```
/// use prtriage_engine::version::highest_version_branch;
///
/// let branches = ["develop", "1.7.8.x", "8.0.x", "8.1.x", "feature/cart"];
/// assert_eq!(highest_version_branch(branches), Some("8.1.x"));
/// ```
pub fn highest_version_branch<'a>(branches: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut best: Option<(&str, Vec<u64>)> = None;
    for name in branches {
        let Some(components) = branch_components(name) else {
            continue;
        };
        let newer = best
            .as_ref()
            .map_or(true, |(_, top)| compare_components(&components, top) == Ordering::Greater);
        if newer {
            best = Some((name, components));
        }
    }
    best.map(|(name, _)| name)
}
