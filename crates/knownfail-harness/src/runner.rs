//! Suite registration and serial execution.
//!
//! Registration is where extensions act: each declared case is turned into
//! a [`CaseDescriptor`] and handed to every [`Extension`] together with the
//! case's [`InterceptorSet`]. After registration the sets are frozen and
//! running a suite never consults metadata again.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use knownfail_error::{KnownFailError, Result};
use knownfail_types::{CaseDescriptor, CaseResult, ExpectedFailure};
use tracing::{debug, info};

use crate::fixture::Fixture;
use crate::invocation::{
    Body, CaseInvocation, InterceptorSet, Invocation, Iteration, run_cleanup, settle,
};
use crate::log::{RunLog, init_run_log};
use crate::report::{CaseReport, RunReport};

/// Registration-time hook, invoked once per declared case.
pub trait Extension<F> {
    /// Inspect the case's metadata and attach interceptors (or a skip) to
    /// `interceptors`. Returning an error aborts registration of the suite.
    fn visit_case(
        &self,
        case: &CaseDescriptor,
        interceptors: &mut InterceptorSet<F>,
    ) -> Result<()>;
}

enum CaseBody<F> {
    Single(Box<Body<F>>),
    Parameterized(Vec<Iteration<F>>),
}

/// A case as declared in a [`Suite`], before registration.
pub struct CaseDef<F> {
    name: String,
    marker: Option<ExpectedFailure>,
    body: CaseBody<F>,
}

impl<F> CaseDef<F> {
    pub fn single(name: impl Into<String>, body: impl Fn(&mut F) -> CaseResult + 'static) -> Self {
        Self {
            name: name.into(),
            marker: None,
            body: CaseBody::Single(Box::new(body)),
        }
    }

    pub fn parameterized(
        name: impl Into<String>,
        iterations: impl IntoIterator<Item = Iteration<F>>,
    ) -> Self {
        Self {
            name: name.into(),
            marker: None,
            body: CaseBody::Parameterized(iterations.into_iter().collect()),
        }
    }

    /// Attach an expected-failure marker to this case.
    #[must_use]
    pub fn expect_failure(mut self, marker: ExpectedFailure) -> Self {
        self.marker = Some(marker);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_parameterized(&self) -> bool {
        matches!(self.body, CaseBody::Parameterized(_))
    }
}

/// A named group of cases sharing a fixture type.
pub struct Suite<F> {
    name: String,
    factory: Box<dyn Fn() -> F>,
    cases: Vec<CaseDef<F>>,
}

impl<F> Suite<F> {
    pub fn new(name: impl Into<String>, factory: impl Fn() -> F + 'static) -> Self {
        Self {
            name: name.into(),
            factory: Box::new(factory),
            cases: Vec::new(),
        }
    }

    /// Declare a case.
    #[must_use]
    pub fn case(mut self, case: CaseDef<F>) -> Self {
        self.cases.push(case);
        self
    }

    /// Shorthand for an unmarked, non-parameterized case.
    #[must_use]
    pub fn test(self, name: impl Into<String>, body: impl Fn(&mut F) -> CaseResult + 'static) -> Self {
        self.case(CaseDef::single(name, body))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F: Default + 'static> Suite<F> {
    /// Suite whose fixture is built with `F::default()`.
    pub fn with_default_fixture(name: impl Into<String>) -> Self {
        Self::new(name, F::default)
    }
}

struct RegisteredCase<F> {
    descriptor: CaseDescriptor,
    body: CaseBody<F>,
    interceptors: InterceptorSet<F>,
}

struct RegisteredSuite<F> {
    name: String,
    factory: Box<dyn Fn() -> F>,
    cases: Vec<RegisteredCase<F>>,
}

/// Serial runner for suites of one fixture type.
///
/// Extensions must be added before the suites they should see are
/// registered.
pub struct Runner<F> {
    extensions: Vec<Box<dyn Extension<F>>>,
    suites: Vec<RegisteredSuite<F>>,
}

impl<F> Default for Runner<F> {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            suites: Vec::new(),
        }
    }
}

impl<F: Fixture> Runner<F> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Extension<F> + 'static) -> Self {
        self.add_extension(extension);
        self
    }

    pub fn add_extension(&mut self, extension: impl Extension<F> + 'static) {
        self.extensions.push(Box::new(extension));
    }

    /// Register a suite, running every extension over every case.
    ///
    /// Nothing is registered when any case fails validation or any
    /// extension rejects a case.
    pub fn register(&mut self, suite: Suite<F>) -> Result<()> {
        let Suite {
            name,
            factory,
            cases,
        } = suite;

        let mut seen = BTreeSet::new();
        let mut registered = Vec::with_capacity(cases.len());
        for case in cases {
            if !seen.insert(case.name.clone()) {
                return Err(KnownFailError::DuplicateCase {
                    suite: name.clone(),
                    case: case.name,
                });
            }
            if matches!(&case.body, CaseBody::Parameterized(iterations) if iterations.is_empty()) {
                return Err(KnownFailError::EmptyParameterizedCase {
                    suite: name.clone(),
                    case: case.name,
                });
            }

            let parameterized = case.is_parameterized();
            let mut descriptor = CaseDescriptor::new(name.clone(), case.name, parameterized);
            descriptor.expected_failure = case.marker;

            let mut interceptors = InterceptorSet::new();
            for extension in &self.extensions {
                extension.visit_case(&descriptor, &mut interceptors)?;
            }
            debug!(
                target: "knownfail.runner",
                case = %descriptor.qualified_name(),
                interceptors = interceptors.len(),
                skipped = interceptors.skip_reason().is_some(),
                "case registered"
            );
            registered.push(RegisteredCase {
                descriptor,
                body: case.body,
                interceptors,
            });
        }

        self.suites.push(RegisteredSuite {
            name,
            factory,
            cases: registered,
        });
        Ok(())
    }

    /// Names of registered suites, in registration order.
    pub fn suite_names(&self) -> impl Iterator<Item = &str> {
        self.suites.iter().map(|suite| suite.name.as_str())
    }

    /// Run every registered case in order.
    pub fn run(&self) -> RunReport {
        self.run_with(|_| {})
    }

    /// Run every registered case, recording lifecycle events and the final
    /// report into a run log directory under `base_dir`.
    pub fn run_logged(&self, base_dir: &Path, run_id: &str) -> Result<(RunReport, PathBuf)> {
        let mut log: RunLog = init_run_log(base_dir, run_id)?;
        let mut log_error = None;
        let report = self.run_with(|report| {
            if log_error.is_none() {
                if let Err(err) = log.record_case(report) {
                    log_error = Some(err);
                }
            }
        });
        if let Some(err) = log_error {
            return Err(err);
        }
        let root = log.finish(&report)?;
        Ok((report, root))
    }

    fn run_with(&self, mut on_case: impl FnMut(&CaseReport)) -> RunReport {
        let mut report = RunReport::default();
        for suite in &self.suites {
            for case in &suite.cases {
                let case_report = run_case(suite.factory.as_ref(), case);
                info!(
                    target: "knownfail.runner",
                    case = %case.descriptor.qualified_name(),
                    status = case_report.status.as_str(),
                    "case finished"
                );
                on_case(&case_report);
                report.cases.push(case_report);
            }
        }
        report
    }
}

fn run_case<F: Fixture>(factory: &dyn Fn() -> F, case: &RegisteredCase<F>) -> CaseReport {
    let descriptor = &case.descriptor;
    if let Some(reason) = case.interceptors.skip_reason() {
        return CaseReport::skipped(descriptor, reason);
    }

    match &case.body {
        CaseBody::Single(body) => {
            let mut fixture = factory();
            let signal = {
                let mut invocation = Invocation::new(
                    &descriptor.suite,
                    &descriptor.name,
                    None,
                    &mut fixture,
                    body.as_ref(),
                    case.interceptors.chain(),
                );
                invocation.proceed()
            };
            let settled = settle(signal, run_cleanup(&mut fixture));
            CaseReport::from_signal(descriptor, &settled, Vec::new())
        }
        CaseBody::Parameterized(iterations) => {
            let mut invocation =
                CaseInvocation::new(descriptor, iterations, factory, case.interceptors.chain());
            let signal = invocation.proceed(&mut |iteration| iteration.proceed());
            CaseReport::from_signal(descriptor, &signal, invocation.into_records())
        }
    }
}

#[cfg(test)]
mod tests {
    use knownfail_types::{Failure, TestSignal};

    use super::*;
    use crate::report::CaseStatus;

    struct SkipEverything;

    impl<F> Extension<F> for SkipEverything {
        fn visit_case(
            &self,
            _case: &CaseDescriptor,
            interceptors: &mut InterceptorSet<F>,
        ) -> Result<()> {
            interceptors.skip("disabled for test");
            Ok(())
        }
    }

    #[test]
    fn duplicate_case_names_are_rejected() {
        let suite = Suite::<()>::with_default_fixture("S")
            .test("same", |_| Ok(()))
            .test("same", |_| Ok(()));
        let err = Runner::new().register(suite).expect_err("duplicate must fail");
        assert!(matches!(err, KnownFailError::DuplicateCase { .. }));
    }

    #[test]
    fn empty_parameterized_case_is_rejected() {
        let suite = Suite::<()>::with_default_fixture("S")
            .case(CaseDef::parameterized("p", Vec::new()));
        let err = Runner::new().register(suite).expect_err("empty iterations must fail");
        assert!(matches!(err, KnownFailError::EmptyParameterizedCase { .. }));
    }

    #[test]
    fn plain_run_reports_pass_and_fail() {
        let suite = Suite::<()>::with_default_fixture("S")
            .test("ok", |_| Ok(()))
            .test("bad", |_| Err(Failure::assertion("nope")))
            .test("panics", |_| panic!("exploded"));
        let mut runner = Runner::new();
        runner.register(suite).expect("register");
        let report = runner.run();

        assert_eq!(report.case("S", "ok").map(|c| c.status), Some(CaseStatus::Passed));
        let bad = report.case("S", "bad").expect("bad case");
        assert_eq!(bad.status, CaseStatus::Failed);
        assert_eq!(bad.message.as_deref(), Some("assertion failure: nope"));
        let panics = report.case("S", "panics").expect("panics case");
        assert_eq!(panics.message.as_deref(), Some("panic failure: exploded"));
        assert!(!report.is_success());
    }

    #[test]
    fn skip_set_by_extension_prevents_body() {
        let suite = Suite::<()>::with_default_fixture("S")
            .test("never", |_| panic!("must not run"));
        let mut runner = Runner::new().with_extension(SkipEverything);
        runner.register(suite).expect("register");
        let report = runner.run();
        let case = report.case("S", "never").expect("case");
        assert_eq!(case.status, CaseStatus::Skipped);
        assert_eq!(case.message.as_deref(), Some("disabled for test"));
    }

    #[test]
    fn parameterized_iterations_are_reported_individually() {
        let suite = Suite::<()>::with_default_fixture("S").case(CaseDef::parameterized(
            "p",
            vec![
                Iteration::new("one", |_| Ok(())),
                Iteration::new("two", |_| Err(Failure::assertion("two broke"))),
            ],
        ));
        let mut runner = Runner::new();
        runner.register(suite).expect("register");
        let report = runner.run();
        let case = report.case("S", "p").expect("case");
        assert_eq!(case.status, CaseStatus::Failed);
        assert_eq!(case.iteration("one").map(|i| i.status), Some(CaseStatus::Passed));
        assert_eq!(case.iteration("two").map(|i| i.status), Some(CaseStatus::Failed));
        assert_eq!(
            case.iteration("two").and_then(|i| i.message.clone()),
            Some(TestSignal::Failed(Failure::assertion("two broke")).message())
        );
    }
}
