//! Public API facade for knownfail.
//!
//! Downstream test suites depend on this crate only. It re-exports the
//! runner, fixture capabilities, expected-failure metadata and the
//! extension, and adds two helpers that wire them together from an
//! [`ExtensionConfig`].

use std::path::Path;

pub use knownfail_core::{
    DEFAULT_MODE_VAR, EnvModeProbe, ExpectedFailureExtension, ExtensionConfig, FixedMode,
    Interception, Manifest, ModeProbe,
};
pub use knownfail_error::{KnownFailError, Result};
pub use knownfail_harness::{
    CaseDef, CaseReport, CaseStatus, CleanupAssertions, Extension, Fixture, Interceptor,
    InterceptorSet, Iteration, IterationReport, ResetError, Resettable, ResettableField,
    RunReport, Runner, Suite,
};
pub use knownfail_types::{CaseResult, ExpectedFailure, Failure, SkipMode, TestSignal};

/// Everything a fixture and its suites usually need.
pub mod prelude {
    pub use crate::{
        CaseDef, CaseResult, CleanupAssertions, ExpectedFailure, Failure, Fixture, Iteration,
        ResetError, Resettable, ResettableField, SkipMode, Suite,
    };
}

/// A runner with the expected-failure extension built from `config`.
pub fn runner<F: Fixture>(config: &ExtensionConfig) -> Result<Runner<F>> {
    Ok(Runner::new().with_extension(config.build_extension()?))
}

/// Run every registered suite, writing a run log under `config.log_dir`
/// when one is configured.
pub fn run<F: Fixture>(
    runner: &Runner<F>,
    config: &ExtensionConfig,
    run_id: &str,
) -> Result<RunReport> {
    match config.log_dir.as_deref() {
        Some(dir) => run_logged(runner, dir, run_id),
        None => Ok(runner.run()),
    }
}

fn run_logged<F: Fixture>(runner: &Runner<F>, dir: &Path, run_id: &str) -> Result<RunReport> {
    runner.run_logged(dir, run_id).map(|(report, _root)| report)
}
