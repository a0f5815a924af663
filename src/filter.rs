//! Pattern predicates for name and group filtering
//!
//! A [`PatternSet`] is OR-combined: one hit from any pattern is enough.
//! Patterns search anywhere in the subject; anchor them with `^`/`$` for
//! whole-name matches.

use regex::RegexSet;

/// Compiled, OR-combined set of regular expressions
#[derive(Debug, Clone)]
pub struct PatternSet {
    set: RegexSet,
}

impl PatternSet {
    /// Compiles every pattern, failing on the first malformed one
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            set: RegexSet::new(patterns)?,
        })
    }

    /// A set with no patterns; callers treat it as "no filtering"
    pub fn empty() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Source text of the compiled patterns
    pub fn patterns(&self) -> &[String] {
        self.set.patterns()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// True if any pattern matches `name`
///
/// An empty set matches nothing here; the orchestrator skips the predicate
/// entirely when no patterns were configured.
///
/// # Examples
///
/// ```
/// use awsusers::filter::{matches_any, PatternSet};
///
/// let patterns = PatternSet::new(["^a", "^z"]).unwrap();
/// assert!(matches_any("alice", &patterns));
/// assert!(!matches_any("bob", &patterns));
/// ```
pub fn matches_any(name: &str, patterns: &PatternSet) -> bool {
    patterns.set.is_match(name)
}

/// True if any of `associated` matches any pattern
///
/// Used to keep a principal when at least one of its groups matches. No
/// groups means no match.
pub fn matches_by_association<S: AsRef<str>>(associated: &[S], patterns: &PatternSet) -> bool {
    associated
        .iter()
        .any(|entry| matches_any(entry.as_ref(), patterns))
}
