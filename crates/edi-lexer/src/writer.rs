//! Segment writer
//!
//! Renders [`RawSegment`]s back to bytes under a set of separators,
//! escaping special characters with the release character and dropping
//! trailing empty elements and components.

use crate::syntax::Separators;
use crate::{Error, Result};
use edi_ir::{RawField, RawSegment};

/// Writes segments with a fixed set of separators
#[derive(Debug, Clone, Copy)]
pub struct SegmentWriter {
    separators: Separators,
    line_breaks: bool,
}

impl SegmentWriter {
    /// Create a writer for the given separators
    #[must_use]
    pub fn new(separators: Separators) -> Self {
        Self {
            separators,
            line_breaks: false,
        }
    }

    /// Emit a newline after every segment terminator
    #[must_use]
    pub fn with_line_breaks(mut self, line_breaks: bool) -> Self {
        self.line_breaks = line_breaks;
        self
    }

    /// Separators this writer uses
    #[must_use]
    pub fn separators(&self) -> &Separators {
        &self.separators
    }

    /// Write a UNA service string advice for these separators
    pub fn write_una(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.separators.to_una());
        if self.line_breaks {
            out.push(b'\n');
        }
    }

    /// Write all segments
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unescapable`] when a value contains a separator and
    /// no release character is configured, and
    /// [`Error::RepetitionUnsupported`] for repeated fields without a
    /// repetition separator.
    pub fn write(&self, segments: &[RawSegment]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for segment in segments {
            self.write_segment(segment, &mut out)?;
        }
        Ok(out)
    }

    /// Write a single segment, terminator included
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unescapable`] when a value contains a separator and
    /// no release character is configured.
    pub fn write_segment(&self, segment: &RawSegment, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(segment.code.as_bytes());

        let used = segment
            .fields
            .iter()
            .rposition(|f| !f.is_empty())
            .map_or(0, |i| i + 1);

        for field in &segment.fields[..used] {
            out.push(self.separators.element);
            self.write_field(&segment.code, field, out)?;
        }

        out.push(self.separators.segment);
        if self.line_breaks && self.separators.segment != b'\n' {
            out.push(b'\n');
        }
        Ok(())
    }

    fn write_field(&self, code: &str, field: &RawField, out: &mut Vec<u8>) -> Result<()> {
        let used = field
            .repetitions
            .iter()
            .rposition(|rep| rep.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1);

        for (i, components) in field.repetitions[..used].iter().enumerate() {
            if i > 0 {
                match self.separators.repetition {
                    Some(sep) => out.push(sep),
                    None => return Err(Error::repetition_unsupported(code)),
                }
            }

            let last = components
                .iter()
                .rposition(|c| !c.is_empty())
                .map_or(0, |i| i + 1);

            for (j, component) in components[..last].iter().enumerate() {
                if j > 0 {
                    out.push(self.separators.component);
                }
                self.write_value(code, component, out)?;
            }
        }

        Ok(())
    }

    fn write_value(&self, code: &str, value: &str, out: &mut Vec<u8>) -> Result<()> {
        for &byte in value.as_bytes() {
            if self.separators.is_special(byte) {
                let Some(release) = self.separators.release else {
                    return Err(Error::Unescapable {
                        code: code.to_string(),
                        character: char::from(byte),
                    });
                };
                out.push(release);
            }
            out.push(byte);
        }
        Ok(())
    }
}
