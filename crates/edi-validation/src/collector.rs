//! Error collection under the strict and lenient policies

use crate::error::{ErrorKind, ValidationError};
use edi_ir::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Failure policy of a parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Collect everything; any blocking finding fails the parse
    #[default]
    Strict,
    /// Collect everything, downgrading recoverable errors to warnings
    Lenient,
}

/// Accumulates findings in the order they were made
#[derive(Debug, Clone, Default)]
pub struct ErrorCollector {
    mode: ValidationMode,
    errors: Vec<ValidationError>,
}

/// Counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub fatal: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl ErrorCollector {
    #[must_use]
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Record a finding, applying the policy's severity mapping
    ///
    /// Returns the severity the finding was recorded with.
    pub fn record(&mut self, mut error: ValidationError) -> Severity {
        if self.mode == ValidationMode::Lenient && error.severity == Severity::Error {
            error.severity = Severity::Warning;
        }

        trace!(
            code = error.code(),
            severity = %error.severity,
            segment = error.position.segment_index,
            "{}",
            error.message
        );

        let severity = error.severity;
        self.errors.push(error);
        severity
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of findings of a kind
    #[must_use]
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    /// Whether an `Error` or `Fatal` finding was recorded
    #[must_use]
    pub fn has_blocking(&self) -> bool {
        self.errors.iter().any(ValidationError::is_blocking)
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary::from_errors(&self.errors)
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl Summary {
    #[must_use]
    pub fn from_errors(errors: &[ValidationError]) -> Self {
        errors.iter().fold(Self::default(), |mut summary, error| {
            match error.severity {
                Severity::Fatal => summary.fatal += 1,
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
            }
            summary
        })
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.fatal + self.errors + self.warnings
    }

    /// No blocking findings
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fatal == 0 && self.errors == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fatal, {} error(s), {} warning(s)",
            self.fatal, self.errors, self.warnings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorPosition;

    fn finding(kind: ErrorKind) -> ValidationError {
        ValidationError::new(kind, ErrorPosition::end_of_input(0), kind.as_str())
    }

    #[test]
    fn test_strict_keeps_severities() {
        let mut collector = ErrorCollector::new(ValidationMode::Strict);
        assert_eq!(collector.record(finding(ErrorKind::InvalidDataType)), Severity::Error);
        assert_eq!(collector.record(finding(ErrorKind::UnexpectedField)), Severity::Warning);

        assert!(collector.has_blocking());
        assert_eq!(
            collector.summary(),
            Summary {
                fatal: 0,
                errors: 1,
                warnings: 1
            }
        );
    }

    #[test]
    fn test_lenient_downgrades_errors_only() {
        let mut collector = ErrorCollector::new(ValidationMode::Lenient);
        collector.record(finding(ErrorKind::UnmatchedSegment));
        collector.record(finding(ErrorKind::MissingMandatoryField));
        assert!(!collector.has_blocking());

        assert_eq!(
            collector.record(finding(ErrorKind::ConflictingDelimiters)),
            Severity::Fatal
        );
        assert!(collector.has_blocking());
        assert_eq!(collector.count(ErrorKind::UnmatchedSegment), 1);
    }

    #[test]
    fn test_order_is_preserved() {
        let mut collector = ErrorCollector::default();
        collector.record(finding(ErrorKind::LengthViolation));
        collector.record(finding(ErrorKind::UnmatchedSegment));

        let kinds: Vec<ErrorKind> = collector.into_errors().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::LengthViolation, ErrorKind::UnmatchedSegment]);
    }

    #[test]
    fn test_summary_display() {
        let summary = Summary {
            fatal: 1,
            errors: 2,
            warnings: 0,
        };
        assert_eq!(summary.to_string(), "1 fatal, 2 error(s), 0 warning(s)");
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_clean());
        assert!(Summary::default().is_clean());
    }
}
