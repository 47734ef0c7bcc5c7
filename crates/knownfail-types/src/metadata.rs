use serde::{Deserialize, Serialize};

/// How a case marked as expected-to-fail is treated when the alternative
/// execution mode is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipMode {
    /// Run the case and expect it to fail.
    #[default]
    None,
    /// Never run the case; report it skipped.
    AlwaysSkip,
    /// Run the case normally but silence its cleanup assertions.
    SuppressCleanupOnly,
}

impl SkipMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AlwaysSkip => "always_skip",
            Self::SuppressCleanupOnly => "suppress_cleanup_only",
        }
    }
}

/// Declarative expected-failure metadata attached to one case.
///
/// An empty `scope` applies the marker in every suite that runs the case;
/// otherwise only suites whose name appears in it. An empty
/// `iteration_matchers` treats every iteration of a parameterized case as
/// expected to fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpectedFailure {
    pub skip: SkipMode,
    pub scope: Vec<String>,
    pub iteration_matchers: Vec<String>,
    /// Free-form note on why the case fails; surfaced in skip messages.
    pub reason: Option<String>,
}

impl ExpectedFailure {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn skip(mut self, skip: SkipMode) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub fn in_suite(mut self, suite: impl Into<String>) -> Self {
        self.scope.push(suite.into());
        self
    }

    #[must_use]
    pub fn iterations<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.iteration_matchers
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_scope_and_patterns() {
        let meta = ExpectedFailure::new()
            .in_suite("A")
            .in_suite("B")
            .iterations(["x.*", "y"])
            .reason("tracked upstream");
        assert_eq!(meta.scope, vec!["A".to_owned(), "B".to_owned()]);
        assert_eq!(meta.iteration_matchers.len(), 2);
        assert_eq!(meta.skip, SkipMode::None);
        assert_eq!(meta.reason.as_deref(), Some("tracked upstream"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let meta: ExpectedFailure =
            serde_json::from_str(r#"{"skip":"suppress_cleanup_only"}"#).expect("valid json");
        assert_eq!(meta.skip, SkipMode::SuppressCleanupOnly);
        assert!(meta.scope.is_empty());
        assert!(meta.iteration_matchers.is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        let parsed = serde_json::from_str::<ExpectedFailure>(r#"{"skipp":"none"}"#);
        assert!(parsed.is_err(), "case=unknown_field typo must not be ignored");
    }

    #[test]
    fn skip_mode_names_match_serde() {
        for mode in [SkipMode::None, SkipMode::AlwaysSkip, SkipMode::SuppressCleanupOnly] {
            let json = serde_json::to_string(&mode).expect("serialize");
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
        }
    }
}
