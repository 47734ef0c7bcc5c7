//! Outcome classification for intercepted invocations.
//!
//! A case under interception is expected to fail. A failure is logged
//! with the `Failed as expected` prefix and swallowed; a clean run is an
//! unexpected success, which means the marker is stale.

use knownfail_harness::{CaseInvocation, Fixture, Invocation, IterationStep};
use knownfail_types::{
    FAILED_AS_EXPECTED, Failure, InterceptionOutcome, IterationContext, TestSignal,
};
use tracing::{debug, info};

use crate::cleanup::suppress_cleanup;
use crate::matcher::IterationMatcher;

/// Case-level record of whether any matched iteration failed as expected.
///
/// Starts unset and is only ever set; one flag lives for exactly one
/// execution of a parameterized case.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassFlag(bool);

impl PassFlag {
    pub fn set(&mut self) {
        self.0 = true;
    }

    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0
    }
}

/// Run a non-parameterized body that is expected to fail.
pub fn classify_non_parameterized<F: Fixture>(
    invocation: &mut Invocation<'_, F>,
) -> InterceptionOutcome {
    match invocation.proceed() {
        Ok(()) => InterceptionOutcome::UnexpectedSuccess,
        Err(signal) => expected_failure(invocation, signal),
    }
}

/// Run one matched iteration through `step`. A failure sets `pass` and is
/// swallowed; a pass is left for the case-level verdict.
fn classify_matched_iteration<F: Fixture>(
    invocation: &mut Invocation<'_, F>,
    step: &mut IterationStep<'_, F>,
    pass: &mut PassFlag,
) -> InterceptionOutcome {
    match step(invocation) {
        Ok(()) => InterceptionOutcome::Passed,
        Err(signal) => {
            let outcome = expected_failure(invocation, signal);
            pass.set();
            outcome
        }
    }
}

/// Run one iteration the matcher did not select. Its result is its own.
fn classify_unmatched_iteration<F>(
    invocation: &mut Invocation<'_, F>,
    step: &mut IterationStep<'_, F>,
) -> (InterceptionOutcome, Result<(), TestSignal>) {
    let result = step(invocation);
    let outcome = match &result {
        Ok(()) => InterceptionOutcome::Passed,
        Err(signal) => InterceptionOutcome::UnexpectedFailure(signal_failure(signal)),
    };
    (outcome, result)
}

/// Run every iteration of a parameterized case through `step`. Iterations
/// selected by `matcher` are expected to fail; the rest run unmodified and
/// keep their own result. The case ends with
/// [`TestSignal::FailedAsExpected`] when at least one selected iteration
/// failed, and with [`TestSignal::UnexpectedSuccess`] otherwise.
pub fn classify_parameterized<F: Fixture>(
    matcher: &IterationMatcher,
    invocation: &mut CaseInvocation<'_, F>,
    step: &mut IterationStep<'_, F>,
) -> Result<(), TestSignal> {
    let descriptor = invocation.descriptor().clone();
    let mut pass = PassFlag::default();
    invocation.proceed(&mut |iteration| {
        let name = iteration.iteration().unwrap_or_default().to_owned();
        if matcher.matches_iteration(&IterationContext::new(&name, &descriptor)) {
            let outcome = classify_matched_iteration(iteration, step, &mut pass);
            debug!(
                target: "knownfail.intercept",
                case = %descriptor.qualified_name(),
                iteration = %name,
                outcome = outcome.as_str(),
                "matched iteration finished"
            );
            outcome_signal(outcome)
        } else {
            let (outcome, result) = classify_unmatched_iteration(iteration, step);
            if let InterceptionOutcome::UnexpectedFailure(failure) = &outcome {
                info!(
                    target: "knownfail.intercept",
                    case = %descriptor.qualified_name(),
                    iteration = %name,
                    detail = %failure,
                    "unmatched iteration failed on its own"
                );
            }
            result
        }
    })?;
    conclude_parameterized(pass)
}

/// Verdict for a parameterized case once every iteration has run.
#[must_use]
pub fn conclude_parameterized(pass: PassFlag) -> Result<(), TestSignal> {
    if pass.is_set() {
        Err(TestSignal::FailedAsExpected)
    } else {
        Err(TestSignal::UnexpectedSuccess)
    }
}

/// Map an outcome to what the interceptor reports to the runner.
pub fn outcome_signal(outcome: InterceptionOutcome) -> Result<(), TestSignal> {
    match outcome {
        InterceptionOutcome::Passed | InterceptionOutcome::ExpectedFailure(_) => Ok(()),
        InterceptionOutcome::UnexpectedSuccess => Err(TestSignal::UnexpectedSuccess),
        InterceptionOutcome::UnexpectedFailure(failure) => Err(TestSignal::Failed(failure)),
    }
}

fn expected_failure<F: Fixture>(
    invocation: &mut Invocation<'_, F>,
    signal: TestSignal,
) -> InterceptionOutcome {
    let failure = signal_failure(&signal);
    info!(
        target: "knownfail.intercept",
        case = %invocation.display_name(),
        kind = failure.kind.as_str(),
        detail = %failure.message,
        "{FAILED_AS_EXPECTED}: {failure}"
    );
    let cleanup = suppress_cleanup(invocation.fixture_mut());
    if !cleanup.is_clean() {
        info!(
            target: "knownfail.intercept",
            case = %invocation.display_name(),
            errors = cleanup.errors.len(),
            "cleanup suppression was partial"
        );
    }
    InterceptionOutcome::ExpectedFailure(failure)
}

fn signal_failure(signal: &TestSignal) -> Failure {
    match signal {
        TestSignal::Failed(failure) => failure.clone(),
        other => Failure::assertion(other.message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_flag_starts_unset_and_stays_set() {
        let mut flag = PassFlag::default();
        assert!(!flag.is_set());
        flag.set();
        flag.set();
        assert!(flag.is_set());
    }

    #[test]
    fn conclusion_depends_only_on_flag() {
        assert_eq!(conclude_parameterized(PassFlag::default()), Err(TestSignal::UnexpectedSuccess));
        let mut flag = PassFlag::default();
        flag.set();
        assert_eq!(conclude_parameterized(flag), Err(TestSignal::FailedAsExpected));
    }

    #[test]
    fn outcome_signals() {
        assert_eq!(outcome_signal(InterceptionOutcome::Passed), Ok(()));
        assert_eq!(
            outcome_signal(InterceptionOutcome::ExpectedFailure(Failure::assertion("x"))),
            Ok(())
        );
        assert_eq!(
            outcome_signal(InterceptionOutcome::UnexpectedSuccess),
            Err(TestSignal::UnexpectedSuccess)
        );
        assert_eq!(
            outcome_signal(InterceptionOutcome::UnexpectedFailure(Failure::panic("p"))),
            Err(TestSignal::Failed(Failure::panic("p")))
        );
    }

    #[test]
    fn non_failure_signals_become_assertions() {
        let failure = signal_failure(&TestSignal::UnexpectedSuccess);
        assert_eq!(failure.kind, knownfail_types::FailureKind::Assertion);
        assert!(failure.message.starts_with("Expected to fail"));
    }
}
