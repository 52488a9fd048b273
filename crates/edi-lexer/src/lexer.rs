//! Segment lexer
//!
//! Turns a byte stream into [`RawSegment`]s. Separators are taken from the
//! [`DialectConfig`] and may be replaced by an in-band service segment at
//! the start of the input: a UNA advice (consumed, not emitted) or an X12
//! ISA segment (emitted, and lexed without component splitting because ISA16
//! holds the component separator itself).

use crate::syntax::{Dialect, DialectConfig, Separators, SyntaxBuffer, UNA_LENGTH};
use crate::LexError;
use edi_ir::{Position, RawField, RawSegment};
use tracing::{debug, trace, warn};

/// How the lexer treats a final segment without terminator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LexMode {
    /// Abort with [`LexError::UnterminatedSegment`]
    #[default]
    Strict,
    /// Keep the segment and report a [`LexIssue`]
    Lenient,
}

/// Recoverable lexical problems reported in lenient mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexIssue {
    /// The input ended inside a segment
    UnterminatedSegment {
        index: usize,
        code: String,
        position: Position,
    },
    /// A value was not valid UTF-8 and was decoded as Latin-1
    NonUtf8Value {
        index: usize,
        code: String,
        position: Position,
    },
}

/// Output of a successful lex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexed {
    /// Segments in input order, indexes starting at 1
    pub segments: Vec<RawSegment>,

    /// Separators in effect after service segment detection
    pub separators: Separators,

    /// Problems that were recovered from
    pub issues: Vec<LexIssue>,
}

/// Dialect lexer
#[derive(Debug, Clone, Default)]
pub struct Lexer {
    config: DialectConfig,
    mode: LexMode,
}

impl Lexer {
    /// Create a strict lexer for the given dialect configuration
    #[must_use]
    pub fn new(config: DialectConfig) -> Self {
        Self {
            config,
            mode: LexMode::Strict,
        }
    }

    /// Set the recovery mode
    #[must_use]
    pub fn with_mode(mut self, mode: LexMode) -> Self {
        self.mode = mode;
        self
    }

    /// Split `input` into segments
    ///
    /// # Errors
    ///
    /// Returns [`LexError::ConflictingDelimiters`] when two separator roles
    /// share a character, and [`LexError::UnterminatedSegment`] in strict mode
    /// when the input ends inside a segment.
    pub fn lex(&self, input: &[u8]) -> Result<Lexed, LexError> {
        let mut buffer = SyntaxBuffer::new(input);
        buffer.skip_bom();
        buffer.skip_whitespace();

        let mut separators = self.config.separators;
        let mut verbatim_first = false;

        if self.config.detect_service_segment {
            match self.config.dialect {
                Dialect::Edifact => {
                    if let Some(sep) = Separators::from_una(buffer.remaining()) {
                        debug!(separators = %sep, "UNA service string advice found");
                        separators = sep;
                        buffer.advance(UNA_LENGTH);
                    }
                }
                Dialect::X12 => {
                    if let Some(sep) = Separators::from_isa(buffer.remaining()) {
                        debug!(separators = %sep, "ISA interchange header found");
                        separators = sep;
                        verbatim_first = true;
                    }
                }
                Dialect::Custom => {}
            }
        }

        separators.check()?;

        let mut segments: Vec<RawSegment> = Vec::new();
        let mut issues = Vec::new();

        loop {
            buffer.skip_whitespace();
            if buffer.is_empty() {
                break;
            }

            let index = segments.len() + 1;
            let split = !(verbatim_first && index == 1);
            let start = buffer.position();

            let SegmentRead {
                elements,
                terminated,
                latin1,
            } = read_segment(&mut buffer, &separators, split);
            let mut elements = elements.into_iter();
            let code = elements
                .next()
                .map(|f| f.value().trim().to_string())
                .unwrap_or_default();
            let fields: Vec<RawField> = elements.collect();

            if code.is_empty() && fields.iter().all(RawField::is_empty) {
                // Stray terminator.
                continue;
            }

            let length = buffer.offset() - start.offset;
            let position = Position::new(start.line, start.column, start.offset, length);

            if latin1 {
                warn!(index, code = %code, "segment is not valid UTF-8, decoded as Latin-1");
                issues.push(LexIssue::NonUtf8Value {
                    index,
                    code: code.clone(),
                    position,
                });
            }

            if !terminated {
                match self.mode {
                    LexMode::Strict => {
                        return Err(LexError::UnterminatedSegment {
                            index,
                            code,
                            line: start.line,
                            column: start.column,
                        });
                    }
                    LexMode::Lenient => {
                        warn!(index, code = %code, "input ends inside a segment");
                        issues.push(LexIssue::UnterminatedSegment {
                            index,
                            code: code.clone(),
                            position,
                        });
                    }
                }
            }

            trace!(index, code = %code, fields = fields.len(), "lexed segment");
            segments.push(RawSegment {
                code,
                index,
                position,
                fields,
            });
        }

        debug!(segments = segments.len(), "lexing complete");

        Ok(Lexed {
            segments,
            separators,
            issues,
        })
    }
}

struct SegmentRead {
    /// Elements, code included as the first
    elements: Vec<RawField>,
    /// A segment terminator ended the segment
    terminated: bool,
    /// Some value fell back to Latin-1 decoding
    latin1: bool,
}

/// Read one segment, code included as the first element
fn read_segment(
    buffer: &mut SyntaxBuffer<'_>,
    separators: &Separators,
    split: bool,
) -> SegmentRead {
    let mut elements = Vec::new();
    let mut repetitions: Vec<Vec<String>> = Vec::new();
    let mut components: Vec<String> = Vec::new();
    let mut value: Vec<u8> = Vec::new();
    let mut released = false;
    let mut latin1 = false;

    let mut take = |bytes: &mut Vec<u8>| decode(std::mem::take(bytes), &mut latin1);

    while let Some(byte) = buffer.next_byte() {
        if released {
            value.push(byte);
            released = false;
        } else if Some(byte) == separators.release {
            released = true;
        } else if byte == separators.segment {
            components.push(take(&mut value));
            repetitions.push(std::mem::take(&mut components));
            elements.push(RawField {
                repetitions: std::mem::take(&mut repetitions),
            });
            return SegmentRead {
                elements,
                terminated: true,
                latin1,
            };
        } else if byte == separators.element {
            components.push(take(&mut value));
            repetitions.push(std::mem::take(&mut components));
            elements.push(RawField {
                repetitions: std::mem::take(&mut repetitions),
            });
        } else if split && byte == separators.component {
            components.push(take(&mut value));
        } else if split && Some(byte) == separators.repetition {
            components.push(take(&mut value));
            repetitions.push(std::mem::take(&mut components));
        } else {
            value.push(byte);
        }
    }

    // A release character with nothing left to escape is kept as data
    if released {
        value.extend(separators.release);
    }

    components.push(take(&mut value));
    repetitions.push(components);
    elements.push(RawField { repetitions });
    SegmentRead {
        elements,
        terminated: false,
        latin1,
    }
}

/// UTF-8 when valid, otherwise Latin-1 (every byte maps to one char)
fn decode(bytes: Vec<u8>, latin1: &mut bool) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        *latin1 = true;
        e.into_bytes().into_iter().map(char::from).collect()
    })
}
