//! Version ordering for release tags.
//!
//! Tags are compared as dotted sequences of non-negative integers after an
//! optional non-numeric prefix (e.g. "v") is stripped. Missing trailing
//! components count as zero, so "1.0" and "1.0.0" are equal.

use log::warn;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Reason a tag could not be read as a dotted version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("version string is empty")]
    Empty,
    #[error("invalid version component '{component}' in '{input}'")]
    InvalidComponent { input: String, component: String },
}

/// A parsed dotted version such as `1.2.3`.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
}

impl Version {
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let numeric = trimmed.trim_start_matches(|c: char| !c.is_ascii_digit());
        if numeric.is_empty() {
            return Err(VersionError::Empty);
        }

        let components = numeric
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(VersionError::InvalidComponent {
                        input: trimmed.to_string(),
                        component: part.to_string(),
                    });
                }
                part.parse::<u64>()
                    .map_err(|_| VersionError::InvalidComponent {
                        input: trimmed.to_string(),
                        component: part.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Version { components })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Equality follows the zero-padded ordering, not the raw component list.
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Returns true only when both inputs parse and `a` orders strictly after `b`.
///
/// Empty or unparsable input yields `false`, so an ambiguous tag never
/// produces an update prompt.
pub fn is_greater(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }

    match (a.parse::<Version>(), b.parse::<Version>()) {
        (Ok(a), Ok(b)) => a > b,
        (Err(e), _) | (_, Err(e)) => {
            warn!("Cannot compare versions '{}' and '{}': {}", a, b, e);
            false
        }
    }
}
