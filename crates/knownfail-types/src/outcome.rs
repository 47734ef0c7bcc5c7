use std::fmt;

use serde::{Deserialize, Serialize};

/// Message carried by every unexpected-success signal.
pub const UNEXPECTED_SUCCESS_MESSAGE: &str =
    "Expected to fail in the alternative execution mode, but passed; remove the expected-failure marker";

/// Message used when a parameterized case failed as expected.
pub const FAILED_AS_EXPECTED: &str = "Failed as expected";

/// What a case body returns.
pub type CaseResult = Result<(), Failure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An explicit assertion in the body did not hold.
    Assertion,
    /// The body panicked.
    Panic,
    /// The body surfaced an error value.
    Error,
    /// Post-test cleanup assertions failed.
    Cleanup,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assertion => "assertion",
            Self::Panic => "panic",
            Self::Error => "error",
            Self::Cleanup => "cleanup",
        }
    }
}

/// A failure raised by a test body or its cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn assertion(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Assertion,
            message: message.into(),
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Panic,
            message: message.into(),
        }
    }

    pub fn cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Cleanup,
            message: message.into(),
        }
    }

    /// Wrap any error value, keeping its source chain in the message.
    pub fn error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            kind: FailureKind::Error,
            message,
        }
    }

    /// Build a failure from a `catch_unwind` payload.
    #[must_use]
    pub fn from_panic_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_owned());
        Self::panic(message)
    }

    /// Ok when `condition` holds, otherwise an assertion failure.
    pub fn ensure(condition: bool, message: impl Into<String>) -> CaseResult {
        if condition {
            Ok(())
        } else {
            Err(Self::assertion(message))
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for Failure {}

/// Classification of one intercepted invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptionOutcome {
    /// Ran without interception and passed.
    Passed,
    /// Failed while a failure was expected.
    ExpectedFailure(Failure),
    /// Passed while a failure was expected.
    UnexpectedSuccess,
    /// Ran without interception and failed.
    UnexpectedFailure(Failure),
}

impl InterceptionOutcome {
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(self, Self::Passed | Self::ExpectedFailure(_))
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::ExpectedFailure(_) => "expected_failure",
            Self::UnexpectedSuccess => "unexpected_success",
            Self::UnexpectedFailure(_) => "unexpected_failure",
        }
    }
}

/// Non-success signal raised through an interceptor chain to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestSignal {
    /// The invocation failed; the case is reported failed.
    Failed(Failure),
    /// A case marked as expected-to-fail passed.
    UnexpectedSuccess,
    /// A parameterized case failed as expected; reported as skipped.
    FailedAsExpected,
}

impl TestSignal {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Failed(failure) => failure.to_string(),
            Self::UnexpectedSuccess => UNEXPECTED_SUCCESS_MESSAGE.to_owned(),
            Self::FailedAsExpected => FAILED_AS_EXPECTED.to_owned(),
        }
    }
}

impl From<Failure> for TestSignal {
    fn from(failure: Failure) -> Self {
        Self::Failed(failure)
    }
}

impl fmt::Display for TestSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for TestSignal {}
