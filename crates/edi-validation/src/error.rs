//! Structured validation findings

use edi_ir::{RawSegment, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of findings, by layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // Lexical
    UnterminatedSegment,
    ConflictingDelimiters,
    InvalidEncoding,
    // Structural
    UnmatchedSegment,
    MaxOccurrenceExceeded,
    MissingMandatorySegment,
    // Field-level
    MissingMandatoryField,
    InvalidDataType,
    LengthViolation,
    UnexpectedField,
}

impl ErrorKind {
    /// Stable report code
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::UnterminatedSegment => "E101",
            ErrorKind::ConflictingDelimiters => "E102",
            ErrorKind::InvalidEncoding => "E103",
            ErrorKind::UnmatchedSegment => "E201",
            ErrorKind::MaxOccurrenceExceeded => "E202",
            ErrorKind::MissingMandatorySegment => "E203",
            ErrorKind::MissingMandatoryField => "E301",
            ErrorKind::InvalidDataType => "E302",
            ErrorKind::LengthViolation => "E303",
            ErrorKind::UnexpectedField => "W301",
        }
    }

    #[must_use]
    pub fn category(self) -> &'static str {
        match self {
            ErrorKind::UnterminatedSegment
            | ErrorKind::ConflictingDelimiters
            | ErrorKind::InvalidEncoding => "lexical",
            ErrorKind::UnmatchedSegment
            | ErrorKind::MaxOccurrenceExceeded
            | ErrorKind::MissingMandatorySegment => "structure",
            ErrorKind::MissingMandatoryField
            | ErrorKind::InvalidDataType
            | ErrorKind::LengthViolation
            | ErrorKind::UnexpectedField => "field",
        }
    }

    /// Severity under the strict policy
    #[must_use]
    pub fn default_severity(self) -> Severity {
        match self {
            ErrorKind::UnexpectedField | ErrorKind::InvalidEncoding => Severity::Warning,
            ErrorKind::ConflictingDelimiters | ErrorKind::UnterminatedSegment => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Whether the finding accounts for a skipped segment
    #[must_use]
    pub fn is_unmatched(self) -> bool {
        matches!(
            self,
            ErrorKind::UnmatchedSegment | ErrorKind::MaxOccurrenceExceeded
        )
    }

    /// Remediation hint for reports
    #[must_use]
    pub fn suggestion(self) -> &'static str {
        match self {
            ErrorKind::UnterminatedSegment => {
                "Terminate the last segment with the segment terminator"
            }
            ErrorKind::ConflictingDelimiters => {
                "Declare distinct characters for every separator role"
            }
            ErrorKind::InvalidEncoding => {
                "Re-encode the interchange as UTF-8 or check its declared character set"
            }
            ErrorKind::UnmatchedSegment => {
                "Check the segment order against the implementation guide, or remove the segment"
            }
            ErrorKind::MaxOccurrenceExceeded => {
                "Remove the extra occurrences or split them into another loop iteration"
            }
            ErrorKind::MissingMandatorySegment => "Add the required segment at this position",
            ErrorKind::MissingMandatoryField => "Provide a value for the required element",
            ErrorKind::InvalidDataType => "Use only characters allowed by the element's data type",
            ErrorKind::LengthViolation => "Adjust the value to the allowed length",
            ErrorKind::UnexpectedField => "Remove the value or check the element position",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnterminatedSegment => "UnterminatedSegment",
            ErrorKind::ConflictingDelimiters => "ConflictingDelimiters",
            ErrorKind::InvalidEncoding => "InvalidEncoding",
            ErrorKind::UnmatchedSegment => "UnmatchedSegment",
            ErrorKind::MaxOccurrenceExceeded => "MaxOccurrenceExceeded",
            ErrorKind::MissingMandatorySegment => "MissingMandatorySegment",
            ErrorKind::MissingMandatoryField => "MissingMandatoryField",
            ErrorKind::InvalidDataType => "InvalidDataType",
            ErrorKind::LengthViolation => "LengthViolation",
            ErrorKind::UnexpectedField => "UnexpectedField",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a finding was made
///
/// `segment_index` is 1-based; findings at end of input use one past the
/// last segment and carry no segment code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPosition {
    pub segment_index: usize,
    pub segment_code: Option<String>,
    pub field: Option<usize>,
    pub component: Option<usize>,
    pub line: Option<usize>,
}

impl ErrorPosition {
    /// Position of a whole segment
    #[must_use]
    pub fn segment(segment: &RawSegment) -> Self {
        Self {
            segment_index: segment.index,
            segment_code: Some(segment.code.clone()),
            field: None,
            component: None,
            line: Some(segment.position.line),
        }
    }

    /// Position after the last of `total` segments
    #[must_use]
    pub fn end_of_input(total: usize) -> Self {
        Self {
            segment_index: total + 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: usize) -> Self {
        self.field = Some(field);
        self
    }

    #[must_use]
    pub fn with_component(mut self, component: Option<usize>) -> Self {
        self.component = component;
        self
    }
}

impl fmt::Display for ErrorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.segment_code {
            Some(code) => write!(f, "segment {} ({code})", self.segment_index)?,
            None => write!(f, "end of input (segment {})", self.segment_index)?,
        }
        if let Some(field) = self.field {
            write!(f, ", element {field:02}")?;
            if let Some(component) = self.component {
                write!(f, "-{component}")?;
            }
        }
        if let Some(line) = self.line {
            write!(f, ", line {line}")?;
        }
        Ok(())
    }
}

/// One structural, field-level or lexical finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub position: ErrorPosition,
    /// Structural path of the finding (e.g. `ORDERS/SG25[1]/QTY`)
    pub path: String,
    pub message: String,
    /// Offending raw value, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl ValidationError {
    /// Create a finding with the kind's default severity
    pub fn new(kind: ErrorKind, position: ErrorPosition, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            position,
            path: String::new(),
            message: message.into(),
            value: None,
            expected: None,
            actual: None,
        }
    }

    #[must_use]
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    #[must_use]
    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn category(&self) -> &'static str {
        self.kind.category()
    }

    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        self.kind.suggestion()
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}: {}",
            self.code(),
            self.severity,
            self.position,
            self.message
        )
    }
}
