//! Minimal serial test runner for knownfail.
//!
//! This crate is the host the expected-failure extension plugs into. It
//! owns the pass/fail/skip lifecycle and exposes two extension points:
//! [`Extension::visit_case`], called once per case at registration, and
//! [`Interceptor`], wrapped around case and iteration execution at run
//! time.

pub mod fixture;
pub mod invocation;
pub mod log;
pub mod report;
pub mod runner;

pub use fixture::{CleanupAssertions, Fixture, ResetError, Resettable, ResettableField};
pub use invocation::{
    Body, CaseInvocation, Interceptor, InterceptorSet, Invocation, Iteration, IterationStep,
};
pub use report::{CaseReport, CaseStatus, IterationReport, RunReport};
pub use runner::{CaseDef, Extension, Runner, Suite};
