//! Expected-failure markers declared outside code.
//!
//! A manifest is a JSON document:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "suites": {
//!     "DependencyResolutionSuite": {
//!       "resolves_dynamic_versions": { "iteration_matchers": ["kotlin.*"] },
//!       "reports_cycles": { "skip": "always_skip", "reason": "hangs" }
//!     }
//!   }
//! }
//! ```
//!
//! Every iteration pattern is compiled when the manifest is loaded, so a
//! malformed pattern fails before any suite is registered.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use knownfail_error::{KnownFailError, Result};
use knownfail_types::ExpectedFailure;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::matcher::IterationMatcher;

/// Version of the manifest layout.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub schema_version: u32,
    /// `suite -> case -> marker`.
    #[serde(default)]
    pub suites: BTreeMap<String, BTreeMap<String, ExpectedFailure>>,
}

impl Manifest {
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            suites: BTreeMap::new(),
        }
    }

    /// Add or replace the marker for `suite::case`.
    pub fn insert(
        &mut self,
        suite: impl Into<String>,
        case: impl Into<String>,
        marker: ExpectedFailure,
    ) {
        self.suites
            .entry(suite.into())
            .or_default()
            .insert(case.into(), marker);
    }

    #[must_use]
    pub fn lookup(&self, suite: &str, case: &str) -> Option<&ExpectedFailure> {
        self.suites.get(suite).and_then(|cases| cases.get(case))
    }

    /// Number of markers across all suites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.suites.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse and validate a manifest; `origin` only labels errors.
    pub fn from_json_str(json: &str, origin: &Path) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json)
            .map_err(|err| KnownFailError::manifest(origin, err.to_string()))?;
        manifest.validate(origin)?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let manifest = Self::from_json_str(&json, path)?;
        info!(
            target: "knownfail.config",
            path = %path.display(),
            markers = manifest.len(),
            "expected-failure manifest loaded"
        );
        Ok(manifest)
    }

    fn validate(&self, origin: &Path) -> Result<()> {
        if self.schema_version != MANIFEST_SCHEMA_VERSION {
            return Err(KnownFailError::manifest(
                origin,
                format!(
                    "unsupported schema version: expected {MANIFEST_SCHEMA_VERSION}, got {}",
                    self.schema_version
                ),
            ));
        }
        for (suite, cases) in &self.suites {
            for (case, marker) in cases {
                IterationMatcher::compile(suite, case, &marker.iteration_matchers)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use knownfail_types::SkipMode;

    use super::*;

    fn origin() -> PathBuf {
        PathBuf::from("inline.json")
    }

    #[test]
    fn parses_documented_layout() {
        let json = r#"{
            "schema_version": 1,
            "suites": {
                "DependencyResolutionSuite": {
                    "resolves_dynamic_versions": { "iteration_matchers": ["kotlin.*"] },
                    "reports_cycles": { "skip": "always_skip", "reason": "hangs" }
                }
            }
        }"#;
        let manifest = Manifest::from_json_str(json, &origin()).expect("valid manifest");
        assert_eq!(manifest.len(), 2);
        let cycles = manifest
            .lookup("DependencyResolutionSuite", "reports_cycles")
            .expect("marker");
        assert_eq!(cycles.skip, SkipMode::AlwaysSkip);
        assert!(manifest.lookup("DependencyResolutionSuite", "missing").is_none());
        assert!(manifest.lookup("OtherSuite", "reports_cycles").is_none());
    }

    #[test]
    fn malformed_pattern_fails_at_load() {
        let json = r#"{"schema_version":1,"suites":{"S":{"c":{"iteration_matchers":["("]}}}}"#;
        let err = Manifest::from_json_str(json, &origin()).expect_err("bad regex");
        assert!(matches!(err, KnownFailError::InvalidIterationPattern { .. }));
    }

    #[test]
    fn wrong_schema_version_is_rejected() {
        let json = r#"{"schema_version":7,"suites":{}}"#;
        let err = Manifest::from_json_str(json, &origin()).expect_err("bad version");
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let err = Manifest::from_json_str("{", &origin()).expect_err("truncated json");
        assert!(err.to_string().contains("inline.json"));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("markers.json");
        let mut manifest = Manifest::new();
        manifest.insert("S", "c", ExpectedFailure::new().skip(SkipMode::SuppressCleanupOnly));
        fs::write(&path, serde_json::to_vec_pretty(&manifest).expect("serialize"))
            .expect("write manifest");

        let loaded = Manifest::load(&path).expect("load");
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Manifest::load(&dir.path().join("absent.json")).expect_err("missing file");
        assert!(matches!(err, KnownFailError::Io(_)));
    }
}
