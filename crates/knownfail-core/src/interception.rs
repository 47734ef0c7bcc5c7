//! Registration-time dispatch of expected-failure markers.
//!
//! [`ExpectedFailureExtension`] visits every case once, when its suite is
//! registered, and resolves it to one [`Interception`]. Only that decision
//! is kept: at run time the attached interceptors never look at metadata.

use knownfail_error::Result;
use knownfail_harness::{
    CaseInvocation, Extension, Fixture, Interceptor, InterceptorSet, Invocation, IterationStep,
};
use knownfail_types::{CaseDescriptor, ExpectedFailure, SkipMode, TestSignal};
use tracing::{debug, info};

use crate::classify::{classify_non_parameterized, classify_parameterized, outcome_signal};
use crate::cleanup::suppress_cleanup;
use crate::manifest::Manifest;
use crate::matcher::IterationMatcher;
use crate::mode::{EnvModeProbe, ModeProbe};
use crate::scope::is_in_scope;

/// How an expected-failure marker applies to one case.
#[derive(Debug, Clone)]
pub enum Interception {
    /// Mode inactive, no marker, marker scoped to other suites, or a plain
    /// case whose name its iteration patterns do not match.
    Bypass,
    /// Never run; report skipped with the given reason.
    Disable { reason: String },
    /// Run normally with cleanup assertions suppressed.
    CleanupOnly,
    /// Run and expect failure.
    Intercept(InterceptKind),
}

#[derive(Debug, Clone)]
pub enum InterceptKind {
    Single,
    Parameterized(IterationMatcher),
}

impl Interception {
    /// Resolve `case` against the mode. Iteration patterns are compiled
    /// for every marked case, active or not, so a malformed pattern is
    /// reported even on runs where the marker would be bypassed.
    pub fn resolve(case: &CaseDescriptor, mode_active: bool) -> Result<Self> {
        let Some(marker) = case.expected_failure.as_ref() else {
            return Ok(Self::Bypass);
        };
        let matcher = IterationMatcher::for_case(case)?;

        if !mode_active || !is_in_scope(&marker.scope, &case.suite) {
            return Ok(Self::Bypass);
        }

        Ok(match marker.skip {
            SkipMode::AlwaysSkip => Self::Disable {
                reason: skip_reason(marker),
            },
            SkipMode::SuppressCleanupOnly => Self::CleanupOnly,
            SkipMode::None if case.parameterized => {
                Self::Intercept(InterceptKind::Parameterized(matcher))
            }
            SkipMode::None if matcher.matches(&case.name) => {
                Self::Intercept(InterceptKind::Single)
            }
            // A plain case outside its own patterns runs unmodified, so a
            // failure is reported as a real one.
            SkipMode::None => Self::Bypass,
        })
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bypass => "bypass",
            Self::Disable { .. } => "disable",
            Self::CleanupOnly => "cleanup_only",
            Self::Intercept(InterceptKind::Single) => "intercept",
            Self::Intercept(InterceptKind::Parameterized(_)) => "intercept_iterations",
        }
    }

    /// Attach this decision to a case's interceptor set.
    pub fn install<F: Fixture>(self, interceptors: &mut InterceptorSet<F>) {
        match self {
            Self::Bypass => {}
            Self::Disable { reason } => interceptors.skip(reason),
            Self::CleanupOnly => interceptors.add(SuppressCleanup),
            Self::Intercept(InterceptKind::Single) => interceptors.add(ExpectFailure),
            Self::Intercept(InterceptKind::Parameterized(matcher)) => {
                interceptors.add(ExpectIterationFailures { matcher });
            }
        }
    }
}

fn skip_reason(marker: &ExpectedFailure) -> String {
    match &marker.reason {
        Some(reason) => format!("Skipped in the alternative execution mode: {reason}"),
        None => "Skipped in the alternative execution mode".to_owned(),
    }
}

/// Cleanup assertions are suppressed before and after the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuppressCleanup;

impl<F: Fixture> Interceptor<F> for SuppressCleanup {
    fn intercept(
        &self,
        invocation: &mut Invocation<'_, F>,
    ) -> std::result::Result<(), TestSignal> {
        suppress_cleanup(invocation.fixture_mut());
        let result = invocation.proceed();
        suppress_cleanup(invocation.fixture_mut());
        result
    }
}

/// A non-parameterized case is expected to fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectFailure;

impl<F: Fixture> Interceptor<F> for ExpectFailure {
    fn intercept(
        &self,
        invocation: &mut Invocation<'_, F>,
    ) -> std::result::Result<(), TestSignal> {
        outcome_signal(classify_non_parameterized(invocation))
    }
}

/// Selected iterations of a parameterized case are expected to fail.
#[derive(Debug, Clone)]
pub struct ExpectIterationFailures {
    matcher: IterationMatcher,
}

impl ExpectIterationFailures {
    #[must_use]
    pub const fn new(matcher: IterationMatcher) -> Self {
        Self { matcher }
    }
}

impl<F: Fixture> Interceptor<F> for ExpectIterationFailures {
    fn intercept_case(
        &self,
        invocation: &mut CaseInvocation<'_, F>,
        step: &mut IterationStep<'_, F>,
    ) -> std::result::Result<(), TestSignal> {
        classify_parameterized(&self.matcher, invocation, step)
    }
}

/// The expected-failure extension for a [`knownfail_harness::Runner`].
pub struct ExpectedFailureExtension {
    mode_active: bool,
    mode_label: String,
    manifest: Manifest,
}

impl ExpectedFailureExtension {
    /// Evaluate `probe` once; every case registered through this extension
    /// sees the same answer.
    pub fn new(probe: &dyn ModeProbe) -> Self {
        let mode_active = probe.is_active();
        let mode_label = probe.describe();
        info!(
            target: "knownfail.intercept",
            mode = %mode_label,
            active = mode_active,
            "expected-failure extension created"
        );
        Self {
            mode_active,
            mode_label,
            manifest: Manifest::new(),
        }
    }

    /// Extension driven by [`EnvModeProbe::default`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(&EnvModeProbe::default())
    }

    /// Markers for cases that carry none in code.
    #[must_use]
    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = manifest;
        self
    }

    #[must_use]
    pub const fn mode_active(&self) -> bool {
        self.mode_active
    }

    #[must_use]
    pub fn mode_label(&self) -> &str {
        &self.mode_label
    }

    /// The decision for `case`, taking the manifest into account.
    pub fn resolve(&self, case: &CaseDescriptor) -> Result<Interception> {
        if case.expected_failure.is_none() {
            if let Some(marker) = self.manifest.lookup(&case.suite, &case.name) {
                let marked = case.clone().with_expected_failure(marker.clone());
                return Interception::resolve(&marked, self.mode_active);
            }
        }
        Interception::resolve(case, self.mode_active)
    }
}

impl std::fmt::Debug for ExpectedFailureExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpectedFailureExtension")
            .field("mode_active", &self.mode_active)
            .field("mode_label", &self.mode_label)
            .field("manifest_markers", &self.manifest.len())
            .finish()
    }
}

impl<F: Fixture> Extension<F> for ExpectedFailureExtension {
    fn visit_case(
        &self,
        case: &CaseDescriptor,
        interceptors: &mut InterceptorSet<F>,
    ) -> Result<()> {
        let interception = self.resolve(case)?;
        debug!(
            target: "knownfail.intercept",
            case = %case.qualified_name(),
            decision = interception.as_str(),
            "expected-failure marker resolved"
        );
        interception.install(interceptors);
        Ok(())
    }
}
