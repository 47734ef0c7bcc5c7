//! Detection of the alternative execution mode.

/// Environment variable read by [`EnvModeProbe::default`].
pub const DEFAULT_MODE_VAR: &str = "KNOWNFAIL_ALTERNATE_MODE";

/// Answers whether the alternative execution mode is active.
pub trait ModeProbe {
    fn is_active(&self) -> bool;

    /// Label used in logs and skip messages.
    fn describe(&self) -> String;
}

/// Mode decided up front, e.g. by a harness that already knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedMode(pub bool);

impl ModeProbe for FixedMode {
    fn is_active(&self) -> bool {
        self.0
    }

    fn describe(&self) -> String {
        format!("fixed({})", self.0)
    }
}

/// Mode read from an environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvModeProbe {
    var: String,
}

impl EnvModeProbe {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    #[must_use]
    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvModeProbe {
    fn default() -> Self {
        Self::new(DEFAULT_MODE_VAR)
    }
}

impl ModeProbe for EnvModeProbe {
    fn is_active(&self) -> bool {
        std::env::var(&self.var).is_ok_and(|raw| is_truthy(&raw))
    }

    fn describe(&self) -> String {
        format!("env({})", self.var)
    }
}

/// `1`, `true`, `yes` and `on`, ignoring case and surrounding whitespace.
#[must_use]
pub fn is_truthy(raw: &str) -> bool {
    let value = raw.trim();
    ["1", "true", "yes", "on"]
        .iter()
        .any(|candidate| value.eq_ignore_ascii_case(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        for raw in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(is_truthy(raw), "case=truthy raw={raw:?}");
        }
        for raw in ["", "0", "false", "off", "enabled", "yes please"] {
            assert!(!is_truthy(raw), "case=falsy raw={raw:?}");
        }
    }

    #[test]
    fn fixed_mode_reports_its_value() {
        assert!(FixedMode(true).is_active());
        assert!(!FixedMode(false).is_active());
        assert_eq!(FixedMode(true).describe(), "fixed(true)");
    }

    #[test]
    fn unset_variable_is_inactive() {
        let probe = EnvModeProbe::new("KNOWNFAIL_TEST_VARIABLE_THAT_IS_NEVER_SET_3F9A");
        assert!(!probe.is_active());
        assert_eq!(
            probe.describe(),
            "env(KNOWNFAIL_TEST_VARIABLE_THAT_IS_NEVER_SET_3F9A)"
        );
    }

    #[test]
    fn default_probe_reads_default_variable() {
        assert_eq!(EnvModeProbe::default().var(), DEFAULT_MODE_VAR);
    }
}
