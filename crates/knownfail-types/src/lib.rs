//! Shared vocabulary for the knownfail workspace.
//!
//! Everything here is plain data: case descriptors built at registration,
//! the declarative expected-failure metadata attached to them, and the
//! failure/outcome/signal values that flow through an interceptor chain.

pub mod descriptor;
pub mod metadata;
pub mod outcome;

pub use descriptor::{CaseDescriptor, IterationContext};
pub use metadata::{ExpectedFailure, SkipMode};
pub use outcome::{
    CaseResult, FAILED_AS_EXPECTED, Failure, FailureKind, InterceptionOutcome, TestSignal,
    UNEXPECTED_SUCCESS_MESSAGE,
};
