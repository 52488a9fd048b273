//! Lexed segments
//!
//! A [`RawSegment`] is what the dialect lexer hands to the structural matcher:
//! a segment code plus unescaped field strings. Fields keep the nesting the
//! wire format had (repetitions, then components) but carry no type
//! information yet.

use crate::metadata::Position;
use serde::{Deserialize, Serialize};

/// One segment as read from the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSegment {
    /// Segment code (e.g. `ISA`, `NM1`, `UNH`)
    pub code: String,

    /// 1-based position of the segment in the input stream
    pub index: usize,

    /// Where the segment starts in the input
    pub position: Position,

    /// Data elements, in order
    pub fields: Vec<RawField>,
}

/// One data element of a raw segment
///
/// Most elements have a single repetition with a single component. Composite
/// elements have several components; elements repeated with the dialect's
/// repetition separator have several repetitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    /// Repetitions, each an ordered list of component values
    pub repetitions: Vec<Vec<String>>,
}

impl RawSegment {
    /// Create a segment with no fields
    pub fn new(code: impl Into<String>, index: usize, position: Position) -> Self {
        Self {
            code: code.into(),
            index,
            position,
            fields: Vec::new(),
        }
    }

    /// Add a field
    #[must_use]
    pub fn with_field(mut self, field: RawField) -> Self {
        self.fields.push(field);
        self
    }

    /// Get a field by 1-based element position
    #[must_use]
    pub fn field(&self, position: usize) -> Option<&RawField> {
        position.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    /// Value of a component of the first repetition, both positions 1-based
    #[must_use]
    pub fn value(&self, element: usize, component: usize) -> Option<&str> {
        self.field(element).and_then(|f| f.component(component))
    }
}

impl RawField {
    /// A simple (single component, single repetition) field
    pub fn simple(value: impl Into<String>) -> Self {
        Self {
            repetitions: vec![vec![value.into()]],
        }
    }

    /// A composite field with the given components
    pub fn composite<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            repetitions: vec![components.into_iter().map(Into::into).collect()],
        }
    }

    /// Components of the first repetition
    #[must_use]
    pub fn components(&self) -> &[String] {
        match self.repetitions.first() {
            Some(components) => components,
            None => &[],
        }
    }

    /// First component of the first repetition
    #[must_use]
    pub fn value(&self) -> &str {
        self.component(1).unwrap_or("")
    }

    /// Component of the first repetition by 1-based position
    #[must_use]
    pub fn component(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.components().get(i))
            .map(String::as_str)
    }

    /// True when no repetition carries any non-empty component
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repetitions
            .iter()
            .all(|rep| rep.iter().all(String::is_empty))
    }
}
