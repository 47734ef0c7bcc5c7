//! Extension configuration.

use std::path::PathBuf;

use knownfail_error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interception::ExpectedFailureExtension;
use crate::manifest::Manifest;
use crate::mode::{DEFAULT_MODE_VAR, EnvModeProbe};

/// Names the variable holding the mode flag.
pub const MODE_VAR_ENV: &str = "KNOWNFAIL_MODE_VAR";
/// Path of an expected-failure manifest.
pub const MANIFEST_ENV: &str = "KNOWNFAIL_MANIFEST";
/// Base directory for run logs.
pub const LOG_DIR_ENV: &str = "KNOWNFAIL_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionConfig {
    pub mode_var: String,
    pub manifest: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            mode_var: DEFAULT_MODE_VAR.to_owned(),
            manifest: None,
            log_dir: None,
        }
    }
}

impl ExtensionConfig {
    /// Configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Configuration from an arbitrary key lookup. Empty values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let config = Self {
            mode_var: read(MODE_VAR_ENV).unwrap_or_else(|| DEFAULT_MODE_VAR.to_owned()),
            manifest: read(MANIFEST_ENV).map(PathBuf::from),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        };
        debug!(
            target: "knownfail.config",
            mode_var = %config.mode_var,
            manifest = ?config.manifest,
            log_dir = ?config.log_dir,
            "extension config resolved"
        );
        config
    }

    #[must_use]
    pub fn mode_probe(&self) -> EnvModeProbe {
        EnvModeProbe::new(self.mode_var.clone())
    }

    /// Build the extension: probe the mode once and load the manifest, if
    /// one is configured.
    pub fn build_extension(&self) -> Result<ExpectedFailureExtension> {
        let extension = ExpectedFailureExtension::new(&self.mode_probe());
        match &self.manifest {
            Some(path) => Ok(extension.with_manifest(Manifest::load(path)?)),
            None => Ok(extension),
        }
    }
}
