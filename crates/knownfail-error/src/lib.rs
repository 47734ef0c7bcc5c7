use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for knownfail registration and configuration.
///
/// Test outcomes are not errors: a failing case body produces a
/// `Failure`, and interception signals travel as `TestSignal`. This type
/// covers what goes wrong before or around a run (bad metadata, unreadable
/// manifests, log I/O).
#[derive(Error, Debug)]
pub enum KnownFailError {
    // === Configuration Errors ===
    /// An iteration matcher pattern failed to compile.
    #[error("invalid iteration pattern '{pattern}' on {suite}::{case}: {detail}")]
    InvalidIterationPattern {
        suite: String,
        case: String,
        pattern: String,
        detail: String,
    },

    /// Two cases in one suite share a name.
    #[error("duplicate case '{case}' in suite '{suite}'")]
    DuplicateCase { suite: String, case: String },

    /// A parameterized case was declared without any iteration.
    #[error("parameterized case {suite}::{case} declares no iterations")]
    EmptyParameterizedCase { suite: String, case: String },

    /// The expected-failure manifest could not be parsed.
    #[error("malformed manifest '{}': {detail}", path.display())]
    Manifest { path: PathBuf, detail: String },

    // === I/O Errors ===
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Internal Errors ===
    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl KnownFailError {
    /// Whether this error comes from declarative metadata and must stop
    /// registration before any case runs.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIterationPattern { .. }
                | Self::DuplicateCase { .. }
                | Self::EmptyParameterizedCase { .. }
                | Self::Manifest { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidIterationPattern { .. } => {
                Some("Fix the regular expression; patterns must match the whole iteration name")
            }
            Self::DuplicateCase { .. } => Some("Rename one of the cases so names are unique"),
            Self::EmptyParameterizedCase { .. } => {
                Some("Add at least one iteration or declare the case as a plain case")
            }
            Self::Manifest { .. } => Some("Validate the manifest JSON against the documented layout"),
            _ => None,
        }
    }

    /// Get the process exit code for this error (for CLI use).
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidIterationPattern { .. }
            | Self::DuplicateCase { .. }
            | Self::EmptyParameterizedCase { .. }
            | Self::Manifest { .. } => 2,
            Self::Io(_) => 74,
            Self::Internal(_) => 70,
        }
    }

    /// Create an invalid-pattern error.
    pub fn invalid_pattern(
        suite: impl Into<String>,
        case: impl Into<String>,
        pattern: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::InvalidIterationPattern {
            suite: suite.into(),
            case: case.into(),
            pattern: pattern.into(),
            detail: detail.into(),
        }
    }

    /// Create a manifest error.
    pub fn manifest(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `KnownFailError`.
pub type Result<T> = std::result::Result<T, KnownFailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_pattern() {
        let err = KnownFailError::invalid_pattern("SmokeSuite", "builds", "iter(", "unclosed group");
        assert_eq!(
            err.to_string(),
            "invalid iteration pattern 'iter(' on SmokeSuite::builds: unclosed group"
        );
    }

    #[test]
    fn error_display_duplicate() {
        let err = KnownFailError::DuplicateCase {
            suite: "s".to_owned(),
            case: "c".to_owned(),
        };
        assert_eq!(err.to_string(), "duplicate case 'c' in suite 's'");
    }

    #[test]
    fn configuration_classification() {
        assert!(KnownFailError::invalid_pattern("s", "c", "(", "x").is_configuration_error());
        assert!(KnownFailError::manifest("m.json", "eof").is_configuration_error());
        assert!(!KnownFailError::internal("bug").is_configuration_error());
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(!KnownFailError::from(io_err).is_configuration_error());
    }

    #[test]
    fn suggestions() {
        assert!(KnownFailError::invalid_pattern("s", "c", "(", "x").suggestion().is_some());
        assert!(KnownFailError::internal("bug").suggestion().is_none());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(KnownFailError::manifest("m.json", "eof").exit_code(), 2);
        assert_eq!(KnownFailError::internal("x").exit_code(), 70);
        let io_err = std::io::Error::other("disk");
        assert_eq!(KnownFailError::Io(io_err).exit_code(), 74);
    }

    #[test]
    fn io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: KnownFailError = io_err.into();
        assert!(matches!(err, KnownFailError::Io(_)));
    }
}
