//! Iteration-name matching for parameterized expected-failure cases.

use knownfail_error::{KnownFailError, Result};
use knownfail_types::{CaseDescriptor, IterationContext};
use regex::Regex;

/// Compiled iteration patterns of one case.
///
/// Every pattern must match the whole iteration name. With no patterns,
/// every iteration matches.
#[derive(Debug, Clone)]
pub struct IterationMatcher {
    sources: Vec<String>,
    compiled: Vec<Regex>,
}

impl IterationMatcher {
    /// Matcher that accepts every iteration.
    #[must_use]
    pub const fn match_all() -> Self {
        Self {
            sources: Vec::new(),
            compiled: Vec::new(),
        }
    }

    /// Compile the iteration patterns declared on `case`.
    pub fn for_case(case: &CaseDescriptor) -> Result<Self> {
        Self::compile(&case.suite, &case.name, case.iteration_matchers())
    }

    /// Compile `patterns`; `suite` and `case` only label errors.
    pub fn compile(suite: &str, case: &str, patterns: &[String]) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
                    KnownFailError::invalid_pattern(suite, case, pattern.as_str(), err.to_string())
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            sources: patterns.to_vec(),
            compiled,
        })
    }

    #[must_use]
    pub fn matches(&self, iteration_name: &str) -> bool {
        self.compiled.is_empty() || self.compiled.iter().any(|re| re.is_match(iteration_name))
    }

    #[must_use]
    pub fn matches_iteration(&self, iteration: &IterationContext<'_>) -> bool {
        self.matches(iteration.name)
    }

    /// Whether this matcher accepts every iteration.
    #[must_use]
    pub fn is_blanket(&self) -> bool {
        self.compiled.is_empty()
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.sources
    }
}

/// One-shot form of [`IterationMatcher::matches`].
pub fn matches(patterns: &[String], iteration_name: &str) -> Result<bool> {
    Ok(IterationMatcher::compile("<adhoc>", "<adhoc>", patterns)?.matches(iteration_name))
}
