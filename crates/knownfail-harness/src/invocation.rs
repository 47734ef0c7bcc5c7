//! Interceptor chains around case bodies and parameterized cases.
//!
//! The runner builds one [`InterceptorSet`] per case when the suite is
//! registered. At run time the set is walked as a chain: the first
//! interceptor is outermost, and each interceptor continues the chain by
//! calling `proceed` on the invocation it was handed.
//!
//! There are two levels:
//! - [`Invocation`]: one body execution (a plain case body, or the body of
//!   one iteration). Wrapped by [`Interceptor::intercept`].
//! - [`CaseInvocation`]: a whole parameterized case. Wrapped by
//!   [`Interceptor::intercept_case`], which may also substitute the step
//!   applied to every iteration.

use std::panic::{self, AssertUnwindSafe};

use knownfail_types::{CaseDescriptor, CaseResult, Failure, TestSignal};
use tracing::warn;

use crate::fixture::Fixture;
use crate::report::IterationReport;

/// A case or iteration body.
pub type Body<F> = dyn Fn(&mut F) -> CaseResult;

/// Step applied to every iteration of a parameterized case.
pub type IterationStep<'s, F> =
    dyn for<'i, 'j> FnMut(&'i mut Invocation<'j, F>) -> Result<(), TestSignal> + 's;

/// Runner-side hook wrapped around case execution.
///
/// Both methods default to continuing the chain unchanged.
pub trait Interceptor<F> {
    /// Wrap one body execution.
    fn intercept(&self, invocation: &mut Invocation<'_, F>) -> Result<(), TestSignal> {
        invocation.proceed()
    }

    /// Wrap a parameterized case. `step` is what the outer chain wants
    /// applied to each iteration; pass it (or a wrapper around it) on to
    /// [`CaseInvocation::proceed`].
    fn intercept_case(
        &self,
        invocation: &mut CaseInvocation<'_, F>,
        step: &mut IterationStep<'_, F>,
    ) -> Result<(), TestSignal> {
        invocation.proceed(step)
    }
}

/// Interceptors attached to one case at registration time.
pub struct InterceptorSet<F> {
    skip_reason: Option<String>,
    interceptors: Vec<Box<dyn Interceptor<F>>>,
}

impl<F> Default for InterceptorSet<F> {
    fn default() -> Self {
        Self {
            skip_reason: None,
            interceptors: Vec::new(),
        }
    }
}

impl<F> InterceptorSet<F> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor; it becomes the innermost one so far.
    pub fn add(&mut self, interceptor: impl Interceptor<F> + 'static) {
        self.interceptors.push(Box::new(interceptor));
    }

    /// Mark the case skipped. Its body will not run.
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.skip_reason = Some(reason.into());
    }

    #[must_use]
    pub fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub(crate) fn chain(&self) -> &[Box<dyn Interceptor<F>>] {
        &self.interceptors
    }
}

impl<F> std::fmt::Debug for InterceptorSet<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorSet")
            .field("skip_reason", &self.skip_reason)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// One body execution travelling through an interceptor chain.
pub struct Invocation<'a, F> {
    suite: &'a str,
    case: &'a str,
    iteration: Option<&'a str>,
    fixture: &'a mut F,
    body: &'a Body<F>,
    chain: &'a [Box<dyn Interceptor<F>>],
}

impl<'a, F> Invocation<'a, F> {
    pub(crate) fn new(
        suite: &'a str,
        case: &'a str,
        iteration: Option<&'a str>,
        fixture: &'a mut F,
        body: &'a Body<F>,
        chain: &'a [Box<dyn Interceptor<F>>],
    ) -> Self {
        Self {
            suite,
            case,
            iteration,
            fixture,
            body,
            chain,
        }
    }

    #[must_use]
    pub fn suite(&self) -> &str {
        self.suite
    }

    #[must_use]
    pub fn case(&self) -> &str {
        self.case
    }

    /// Iteration name, `None` for a non-parameterized case.
    #[must_use]
    pub fn iteration(&self) -> Option<&str> {
        self.iteration
    }

    /// `suite::case` or `suite::case[iteration]`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.iteration {
            Some(iteration) => format!("{}::{}[{iteration}]", self.suite, self.case),
            None => format!("{}::{}", self.suite, self.case),
        }
    }

    pub fn fixture_mut(&mut self) -> &mut F {
        self.fixture
    }

    /// Continue the chain; at its end, run the body.
    pub fn proceed(&mut self) -> Result<(), TestSignal> {
        let chain = self.chain;
        match chain.split_first() {
            Some((next, rest)) => {
                self.chain = rest;
                let result = next.intercept(self);
                self.chain = chain;
                result
            }
            None => run_body(self.body, self.fixture).map_err(TestSignal::Failed),
        }
    }
}

/// A named iteration of a parameterized case.
pub struct Iteration<F> {
    pub(crate) name: String,
    pub(crate) body: Box<Body<F>>,
}

impl<F> Iteration<F> {
    pub fn new(name: impl Into<String>, body: impl Fn(&mut F) -> CaseResult + 'static) -> Self {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F> std::fmt::Debug for Iteration<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Iteration").field("name", &self.name).finish()
    }
}

/// A parameterized case travelling through an interceptor chain.
///
/// Iteration failures never abort the case: each iteration is settled,
/// cleaned up and recorded on its own, and the chain's result only
/// describes the case as a whole.
pub struct CaseInvocation<'a, F> {
    descriptor: &'a CaseDescriptor,
    iterations: &'a [Iteration<F>],
    factory: &'a dyn Fn() -> F,
    chain: &'a [Box<dyn Interceptor<F>>],
    body_chain: &'a [Box<dyn Interceptor<F>>],
    cleanup: fn(&mut F) -> CaseResult,
    records: Vec<IterationReport>,
}

impl<'a, F> CaseInvocation<'a, F> {
    pub(crate) fn new(
        descriptor: &'a CaseDescriptor,
        iterations: &'a [Iteration<F>],
        factory: &'a dyn Fn() -> F,
        chain: &'a [Box<dyn Interceptor<F>>],
    ) -> Self
    where
        F: Fixture,
    {
        Self {
            descriptor,
            iterations,
            factory,
            chain,
            body_chain: chain,
            cleanup: run_cleanup::<F>,
            records: Vec::with_capacity(iterations.len()),
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> &CaseDescriptor {
        self.descriptor
    }

    /// Iteration names in execution order.
    pub fn iteration_names(&self) -> impl Iterator<Item = &str> {
        self.iterations.iter().map(Iteration::name)
    }

    /// Continue the chain; at its end, run every iteration through `step`.
    pub fn proceed(&mut self, step: &mut IterationStep<'_, F>) -> Result<(), TestSignal> {
        let chain = self.chain;
        if let Some((next, rest)) = chain.split_first() {
            self.chain = rest;
            let result = next.intercept_case(self, step);
            self.chain = chain;
            return result;
        }

        let descriptor = self.descriptor;
        for iteration in self.iterations {
            let mut fixture = (self.factory)();
            let signal = {
                let mut invocation = Invocation::new(
                    &descriptor.suite,
                    &descriptor.name,
                    Some(&iteration.name),
                    &mut fixture,
                    iteration.body.as_ref(),
                    self.body_chain,
                );
                step(&mut invocation)
            };
            let settled = settle(signal, (self.cleanup)(&mut fixture));
            self.records
                .push(IterationReport::from_signal(&iteration.name, settled));
        }
        Ok(())
    }

    pub(crate) fn into_records(self) -> Vec<IterationReport> {
        self.records
    }
}

/// Run a body, turning a panic into a [`Failure`].
pub(crate) fn run_body<F>(body: &Body<F>, fixture: &mut F) -> CaseResult {
    match panic::catch_unwind(AssertUnwindSafe(|| body(fixture))) {
        Ok(result) => result,
        Err(payload) => Err(Failure::from_panic_payload(payload.as_ref())),
    }
}

/// Run a fixture's cleanup assertions, turning a panic into a [`Failure`].
pub(crate) fn run_cleanup<F: Fixture>(fixture: &mut F) -> CaseResult {
    match panic::catch_unwind(AssertUnwindSafe(|| fixture.cleanup())) {
        Ok(result) => result,
        Err(payload) => Err(Failure::cleanup(
            Failure::from_panic_payload(payload.as_ref()).message,
        )),
    }
}

/// Fold the cleanup result into the body's signal. The body's own signal
/// wins when both are errors.
pub(crate) fn settle(
    signal: Result<(), TestSignal>,
    cleanup: CaseResult,
) -> Result<(), TestSignal> {
    match (signal, cleanup) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(failure)) => Err(TestSignal::Failed(failure)),
        (Err(signal), Ok(())) => Err(signal),
        (Err(signal), Err(failure)) => {
            warn!(
                target: "knownfail.runner",
                signal = %signal,
                cleanup = %failure,
                "cleanup failure masked by earlier signal"
            );
            Err(signal)
        }
    }
}
