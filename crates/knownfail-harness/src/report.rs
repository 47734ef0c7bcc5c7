//! Run results as seen by whoever drives the runner.

use knownfail_types::{CaseDescriptor, TestSignal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

impl CaseStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    fn from_signal(signal: &Result<(), TestSignal>) -> (Self, Option<String>) {
        match signal {
            Ok(()) => (Self::Passed, None),
            Err(TestSignal::FailedAsExpected) => {
                (Self::Skipped, Some(TestSignal::FailedAsExpected.message()))
            }
            Err(other) => (Self::Failed, Some(other.message())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationReport {
    pub name: String,
    pub status: CaseStatus,
    pub message: Option<String>,
}

impl IterationReport {
    pub(crate) fn from_signal(name: &str, signal: Result<(), TestSignal>) -> Self {
        let (status, message) = CaseStatus::from_signal(&signal);
        Self {
            name: name.to_owned(),
            status,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReport {
    pub suite: String,
    pub case: String,
    pub status: CaseStatus,
    pub message: Option<String>,
    /// Per-iteration results; empty for non-parameterized cases.
    pub iterations: Vec<IterationReport>,
}

impl CaseReport {
    pub(crate) fn skipped(descriptor: &CaseDescriptor, reason: &str) -> Self {
        Self {
            suite: descriptor.suite.clone(),
            case: descriptor.name.clone(),
            status: CaseStatus::Skipped,
            message: Some(reason.to_owned()),
            iterations: Vec::new(),
        }
    }

    /// Build the case-level report. A case whose own chain succeeded is
    /// still failed when any of its iterations failed.
    pub(crate) fn from_signal(
        descriptor: &CaseDescriptor,
        signal: &Result<(), TestSignal>,
        iterations: Vec<IterationReport>,
    ) -> Self {
        let (mut status, mut message) = CaseStatus::from_signal(signal);
        if status == CaseStatus::Passed {
            let failed: Vec<&str> = iterations
                .iter()
                .filter(|iteration| iteration.status == CaseStatus::Failed)
                .map(|iteration| iteration.name.as_str())
                .collect();
            if !failed.is_empty() {
                status = CaseStatus::Failed;
                message = Some(format!("failed iterations: {}", failed.join(", ")));
            }
        }
        Self {
            suite: descriptor.suite.clone(),
            case: descriptor.name.clone(),
            status,
            message,
            iterations,
        }
    }

    #[must_use]
    pub fn iteration(&self, name: &str) -> Option<&IterationReport> {
        self.iterations.iter().find(|iteration| iteration.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    #[must_use]
    pub fn case(&self, suite: &str, case: &str) -> Option<&CaseReport> {
        self.cases
            .iter()
            .find(|report| report.suite == suite && report.case == case)
    }

    #[must_use]
    pub fn count(&self, status: CaseStatus) -> usize {
        self.cases
            .iter()
            .filter(|report| report.status == status)
            .count()
    }

    /// Iterations that failed, across every case, as `(suite, case, iteration)`.
    #[must_use]
    pub fn failed_iterations(&self) -> Vec<(&str, &str, &str)> {
        self.cases
            .iter()
            .flat_map(|report| {
                report
                    .iterations
                    .iter()
                    .filter(|iteration| iteration.status == CaseStatus::Failed)
                    .map(move |iteration| {
                        (
                            report.suite.as_str(),
                            report.case.as_str(),
                            iteration.name.as_str(),
                        )
                    })
            })
            .collect()
    }

    /// No failed case and no failed iteration.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.count(CaseStatus::Failed) == 0 && self.failed_iterations().is_empty()
    }

    /// Append another run's cases.
    pub fn merge(&mut self, other: Self) {
        self.cases.extend(other.cases);
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Err` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Err` if JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use knownfail_types::Failure;

    use super::*;

    fn descriptor() -> CaseDescriptor {
        CaseDescriptor::new("Suite", "case", true)
    }

    #[test]
    fn failed_as_expected_maps_to_skipped() {
        let report = CaseReport::from_signal(&descriptor(), &Err(TestSignal::FailedAsExpected), Vec::new());
        assert_eq!(report.status, CaseStatus::Skipped);
        assert_eq!(report.message.as_deref(), Some("Failed as expected"));
    }

    #[test]
    fn passing_case_with_failed_iteration_is_failed() {
        let iterations = vec![
            IterationReport::from_signal("a", Ok(())),
            IterationReport::from_signal("b", Err(Failure::assertion("boom").into())),
        ];
        let report = CaseReport::from_signal(&descriptor(), &Ok(()), iterations);
        assert_eq!(report.status, CaseStatus::Failed);
        assert_eq!(report.message.as_deref(), Some("failed iterations: b"));
    }

    #[test]
    fn skipped_case_keeps_independent_iteration_failure() {
        let iterations = vec![
            IterationReport::from_signal("a", Ok(())),
            IterationReport::from_signal("b", Err(Failure::assertion("boom").into())),
        ];
        let report =
            CaseReport::from_signal(&descriptor(), &Err(TestSignal::FailedAsExpected), iterations);
        let run = RunReport {
            cases: vec![report],
        };
        assert_eq!(run.count(CaseStatus::Skipped), 1);
        assert_eq!(run.failed_iterations(), [("Suite", "case", "b")]);
        assert!(!run.is_success());
    }

    #[test]
    fn json_roundtrip_preserves_statuses() {
        let run = RunReport {
            cases: vec![CaseReport::skipped(&descriptor(), "known broken")],
        };
        let json = run.to_json().expect("serialize");
        assert!(json.contains("\"skipped\""));
        let restored = RunReport::from_json(&json).expect("deserialize");
        assert_eq!(restored, run);
    }
}
