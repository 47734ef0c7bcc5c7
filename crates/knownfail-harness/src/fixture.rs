//! Fixture capabilities the runner and its extensions rely on.
//!
//! A fixture is the per-case test instance. Besides its own state it may
//! hold collaborators (mocks, stub servers) that verify pending
//! expectations after the body, in [`Fixture::cleanup`]. Extensions that
//! need to silence those verifications go through two opt-in
//! capabilities: [`CleanupAssertions`] on the fixture itself, and
//! [`Resettable`] on each collaborator, enumerated by
//! [`Fixture::resettable_fields`].

use knownfail_types::CaseResult;

/// Error raised by a collaborator while resetting its expectations.
pub type ResetError = Box<dyn std::error::Error + Send + Sync>;

/// A collaborator whose pending expectations can be discarded.
///
/// Implementations must tolerate being reset when nothing is pending and
/// being reset repeatedly.
pub trait Resettable {
    fn reset_expectations(&mut self) -> Result<(), ResetError>;
}

/// A fixture that can switch off its own post-test assertions.
pub trait CleanupAssertions {
    fn ignore_cleanup_assertions(&mut self);
}

/// One capability-typed member of a fixture.
///
/// `value` is `None` when the member exists but holds nothing yet, e.g. a
/// lazily started server.
pub struct ResettableField<'a> {
    pub name: &'static str,
    pub value: Option<&'a mut dyn Resettable>,
}

impl<'a> ResettableField<'a> {
    pub fn new(name: &'static str, value: &'a mut dyn Resettable) -> Self {
        Self {
            name,
            value: Some(value),
        }
    }

    pub fn optional<R: Resettable + 'a>(name: &'static str, value: Option<&'a mut R>) -> Self {
        Self {
            name,
            value: value.map(|inner| inner as &mut dyn Resettable),
        }
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

impl std::fmt::Debug for ResettableField<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResettableField")
            .field("name", &self.name)
            .field("set", &self.is_set())
            .finish()
    }
}

/// Per-case test instance.
///
/// Fixtures that embed a base fixture should chain its members into
/// [`Fixture::resettable_fields`] so inherited collaborators are reset too.
pub trait Fixture {
    /// Post-test assertions, run after the body (or iteration body).
    fn cleanup(&mut self) -> CaseResult {
        Ok(())
    }

    /// The ignore-cleanup-assertions capability, when the fixture has one.
    fn cleanup_assertions(&mut self) -> Option<&mut dyn CleanupAssertions> {
        None
    }

    /// Every member whose type implements [`Resettable`].
    fn resettable_fields(&mut self) -> Vec<ResettableField<'_>> {
        Vec::new()
    }
}

impl Fixture for () {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        resets: u32,
    }

    impl Resettable for Counter {
        fn reset_expectations(&mut self) -> Result<(), ResetError> {
            self.resets += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Base {
        shared: Counter,
    }

    impl Fixture for Base {
        fn resettable_fields(&mut self) -> Vec<ResettableField<'_>> {
            vec![ResettableField::new("shared", &mut self.shared)]
        }
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
        own: Counter,
        lazy: Option<Counter>,
    }

    impl Fixture for Derived {
        fn resettable_fields(&mut self) -> Vec<ResettableField<'_>> {
            let mut fields = self.base.resettable_fields();
            fields.push(ResettableField::new("own", &mut self.own));
            fields.push(ResettableField::optional("lazy", self.lazy.as_mut()));
            fields
        }
    }

    #[test]
    fn derived_fixture_chains_base_members() {
        let mut fixture = Derived::default();
        let fields = fixture.resettable_fields();
        let names: Vec<_> = fields.iter().map(|field| field.name).collect();
        assert_eq!(names, ["shared", "own", "lazy"]);
        assert!(!fields[2].is_set(), "case=lazy_member unset option is reported as null");
    }

    #[test]
    fn unit_fixture_has_no_capabilities() {
        let mut unit = ();
        assert!(unit.cleanup().is_ok());
        assert!(unit.cleanup_assertions().is_none());
        assert!(unit.resettable_fields().is_empty());
    }
}
