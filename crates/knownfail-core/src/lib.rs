//! Expected-failure interception.
//!
//! Some tests are known to fail when the code under test runs in an
//! alternative execution mode. Marking them with [`ExpectedFailure`]
//! metadata and registering an [`ExpectedFailureExtension`] with the runner
//! turns those failures into skips, and turns a marked test that starts
//! passing into a failure so stale markers get removed.
//!
//! The pieces, innermost first:
//! - [`scope`]: does a marker apply to the current suite
//! - [`matcher`]: which iterations of a parameterized case are expected to fail
//! - [`cleanup`]: best-effort reset of fixture collaborators after an expected failure
//! - [`classify`]: outcome of one intercepted execution
//! - [`interception`]: the registration-time decision and the interceptors it installs
//!
//! [`ExpectedFailure`]: knownfail_types::ExpectedFailure

pub mod classify;
pub mod cleanup;
pub mod config;
pub mod interception;
pub mod manifest;
pub mod matcher;
pub mod mode;
pub mod scope;

pub use classify::PassFlag;
pub use cleanup::{CleanupError, CleanupReport, suppress_cleanup};
pub use config::ExtensionConfig;
pub use interception::{
    ExpectFailure, ExpectIterationFailures, ExpectedFailureExtension, InterceptKind, Interception,
    SuppressCleanup,
};
pub use manifest::{MANIFEST_SCHEMA_VERSION, Manifest};
pub use matcher::IterationMatcher;
pub use mode::{DEFAULT_MODE_VAR, EnvModeProbe, FixedMode, ModeProbe};
pub use scope::is_in_scope;
