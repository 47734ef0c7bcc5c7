use serde::{Deserialize, Serialize};

use crate::metadata::{ExpectedFailure, SkipMode};

/// Identity and metadata of one declared test case.
///
/// Built when a suite is registered with a runner and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDescriptor {
    /// Name of the suite that declares the case.
    pub suite: String,
    /// Case name, unique within its suite.
    pub name: String,
    /// Whether the case runs as a sequence of named iterations.
    pub parameterized: bool,
    /// Expected-failure marker, if the case carries one.
    pub expected_failure: Option<ExpectedFailure>,
}

impl CaseDescriptor {
    #[must_use]
    pub fn new(suite: impl Into<String>, name: impl Into<String>, parameterized: bool) -> Self {
        Self {
            suite: suite.into(),
            name: name.into(),
            parameterized,
            expected_failure: None,
        }
    }

    #[must_use]
    pub fn with_expected_failure(mut self, marker: ExpectedFailure) -> Self {
        self.expected_failure = Some(marker);
        self
    }

    /// `suite::name`, the form used in logs and reports.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.suite, self.name)
    }

    #[must_use]
    pub fn skip_mode(&self) -> SkipMode {
        self.expected_failure
            .as_ref()
            .map_or(SkipMode::None, |marker| marker.skip)
    }

    #[must_use]
    pub fn scope(&self) -> &[String] {
        self.expected_failure
            .as_ref()
            .map(|marker| marker.scope.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn iteration_matchers(&self) -> &[String] {
        self.expected_failure
            .as_ref()
            .map(|marker| marker.iteration_matchers.as_slice())
            .unwrap_or_default()
    }
}

/// One concrete invocation of a parameterized case.
#[derive(Debug, Clone, Copy)]
pub struct IterationContext<'a> {
    pub name: &'a str,
    pub descriptor: &'a CaseDescriptor,
}

impl<'a> IterationContext<'a> {
    #[must_use]
    pub const fn new(name: &'a str, descriptor: &'a CaseDescriptor) -> Self {
        Self { name, descriptor }
    }
}
