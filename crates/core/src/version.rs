//! Optimistic concurrency expectations.

/// Revision a stored entity must be at for a write to go through.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpectedVersion(pub u64);

impl ExpectedVersion {
    /// The expectation for persisting `next_version`: the stored copy must be
    /// exactly one revision behind.
    pub fn preceding(next_version: u64) -> Self {
        ExpectedVersion(next_version.saturating_sub(1))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn matches(self, actual: u64) -> bool {
        self.0 == actual
    }
}

impl core::fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preceding_expects_one_revision_behind() {
        assert_eq!(ExpectedVersion::preceding(3), ExpectedVersion(2));
        assert!(ExpectedVersion::preceding(3).matches(2));
        assert!(!ExpectedVersion::preceding(3).matches(3));
    }

    #[test]
    fn first_revision_has_no_predecessor() {
        assert_eq!(ExpectedVersion::preceding(0).get(), 0);
        assert!(!ExpectedVersion::preceding(1).matches(1));
    }
}
