//! Optimistic concurrency primitives.

use crate::error::{DomainError, DomainResult};

/// Optimistic concurrency expectation for a stored row.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The row must not exist yet.
    Absent,
    /// Require the row to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// `actual` is `None` when the row does not exist.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match self {
            ExpectedVersion::Absent => actual.is_none(),
            ExpectedVersion::Exact(v) => actual == Some(v),
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_version_must_match() {
        assert!(ExpectedVersion::Exact(3).matches(Some(3)));
        assert!(!ExpectedVersion::Exact(3).matches(Some(4)));
        assert!(!ExpectedVersion::Exact(3).matches(None));
    }

    #[test]
    fn absent_rejects_existing_rows() {
        assert!(ExpectedVersion::Absent.matches(None));
        let err = ExpectedVersion::Absent.check(Some(1)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
