//! Best-effort suppression of a fixture's post-test assertions.
//!
//! Used when a case failed as expected (its collaborators are left with
//! expectations the failed body never satisfied) and for cases marked
//! `suppress_cleanup_only`. A collaborator that fails to reset is logged
//! and skipped; the remaining collaborators are still reset.

use std::panic::{self, AssertUnwindSafe};

use knownfail_harness::{Fixture, ResettableField};
use knownfail_types::Failure;
use tracing::{debug, warn};

/// A collaborator that could not be reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupError {
    pub field: &'static str,
    pub message: String,
}

/// What one suppression pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// The fixture's own cleanup assertions were switched off.
    pub ignored_assertions: bool,
    /// Members whose expectations were reset.
    pub reset: Vec<&'static str>,
    /// Members that currently hold no collaborator.
    pub unset: Vec<&'static str>,
    pub errors: Vec<CleanupError>,
}

impl CleanupReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Members a reset was attempted on, successful or not.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.reset.len() + self.errors.len()
    }
}

/// Switch off `fixture`'s cleanup assertions and reset every resettable
/// collaborator it holds. Never fails; problems are logged and reported.
pub fn suppress_cleanup<F: Fixture + ?Sized>(fixture: &mut F) -> CleanupReport {
    let mut report = CleanupReport::default();

    if let Some(capability) = fixture.cleanup_assertions() {
        match panic::catch_unwind(AssertUnwindSafe(|| capability.ignore_cleanup_assertions())) {
            Ok(()) => report.ignored_assertions = true,
            Err(payload) => {
                let failure = Failure::from_panic_payload(payload.as_ref());
                warn!(
                    target: "knownfail.cleanup",
                    error = %failure.message,
                    "ignoring cleanup assertions panicked"
                );
            }
        }
    }

    for field in fixture.resettable_fields() {
        reset_field(field, &mut report);
    }

    debug!(
        target: "knownfail.cleanup",
        ignored_assertions = report.ignored_assertions,
        reset = report.reset.len(),
        unset = report.unset.len(),
        errors = report.errors.len(),
        "cleanup suppressed"
    );
    report
}

fn reset_field(field: ResettableField<'_>, report: &mut CleanupReport) {
    let ResettableField { name, value } = field;
    let Some(collaborator) = value else {
        report.unset.push(name);
        return;
    };

    let message = match panic::catch_unwind(AssertUnwindSafe(|| collaborator.reset_expectations())) {
        Ok(Ok(())) => {
            report.reset.push(name);
            return;
        }
        Ok(Err(err)) => err.to_string(),
        Err(payload) => Failure::from_panic_payload(payload.as_ref()).message,
    };

    warn!(
        target: "knownfail.cleanup",
        field = name,
        error = %message,
        "failed to reset expectations"
    );
    report.errors.push(CleanupError {
        field: name,
        message,
    });
}

#[cfg(test)]
mod tests {
    use knownfail_harness::{CleanupAssertions, ResetError, Resettable};

    use super::*;

    #[derive(Default)]
    struct Stub {
        pending: u32,
        resets: u32,
    }

    impl Resettable for Stub {
        fn reset_expectations(&mut self) -> Result<(), ResetError> {
            self.pending = 0;
            self.resets += 1;
            Ok(())
        }
    }

    struct Broken;

    impl Resettable for Broken {
        fn reset_expectations(&mut self) -> Result<(), ResetError> {
            Err("server already stopped".into())
        }
    }

    struct Panicking;

    impl Resettable for Panicking {
        fn reset_expectations(&mut self) -> Result<(), ResetError> {
            panic!("reset exploded")
        }
    }

    #[derive(Default)]
    struct Flags {
        ignored: bool,
    }

    impl CleanupAssertions for Flags {
        fn ignore_cleanup_assertions(&mut self) {
            self.ignored = true;
        }
    }

    struct ServiceFixture {
        flags: Flags,
        first: Broken,
        second: Stub,
        third: Panicking,
        fourth: Stub,
        absent: Option<Stub>,
    }

    impl ServiceFixture {
        fn new() -> Self {
            Self {
                flags: Flags::default(),
                first: Broken,
                second: Stub {
                    pending: 3,
                    resets: 0,
                },
                third: Panicking,
                fourth: Stub::default(),
                absent: None,
            }
        }
    }

    impl Fixture for ServiceFixture {
        fn cleanup_assertions(&mut self) -> Option<&mut dyn CleanupAssertions> {
            Some(&mut self.flags)
        }

        fn resettable_fields(&mut self) -> Vec<ResettableField<'_>> {
            vec![
                ResettableField::new("first", &mut self.first),
                ResettableField::new("second", &mut self.second),
                ResettableField::new("third", &mut self.third),
                ResettableField::new("fourth", &mut self.fourth),
                ResettableField::optional("absent", self.absent.as_mut()),
            ]
        }
    }

    #[test]
    fn failing_resets_do_not_stop_the_scan() {
        let mut fixture = ServiceFixture::new();
        let report = suppress_cleanup(&mut fixture);

        assert!(report.ignored_assertions);
        assert!(fixture.flags.ignored);
        assert_eq!(report.attempted(), 4);
        assert_eq!(report.reset, ["second", "fourth"]);
        assert_eq!(report.unset, ["absent"]);
        assert_eq!(
            report.errors,
            [
                CleanupError {
                    field: "first",
                    message: "server already stopped".to_owned(),
                },
                CleanupError {
                    field: "third",
                    message: "reset exploded".to_owned(),
                },
            ]
        );
        assert_eq!(fixture.second.pending, 0);
        assert_eq!(fixture.second.resets, 1);
    }

    #[test]
    fn repeated_suppression_is_harmless() {
        let mut fixture = ServiceFixture::new();
        let first = suppress_cleanup(&mut fixture);
        let second = suppress_cleanup(&mut fixture);
        assert_eq!(first, second);
        assert_eq!(fixture.second.resets, 2);
        assert_eq!(fixture.second.pending, 0);
    }

    #[test]
    fn fixture_without_capabilities_is_a_no_op() {
        let report = suppress_cleanup(&mut ());
        assert_eq!(report, CleanupReport::default());
        assert!(report.is_clean());
    }
}
