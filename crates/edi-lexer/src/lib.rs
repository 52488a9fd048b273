//! # edi-lexer
//!
//! Splits raw EDI input into [`RawSegment`](edi_ir::RawSegment)s.
//!
//! Separators come from the [`Dialect`] defaults, from explicit
//! configuration, or from an in-band service segment (X12 `ISA`, EDIFACT
//! `UNA`) at the start of the document. The [`SegmentWriter`] does the
//! reverse and renders segments under a given set of separators.

pub mod lexer;
pub mod syntax;
pub mod writer;

pub use lexer::{LexIssue, LexMode, Lexed, Lexer};
pub use syntax::{Dialect, DialectConfig, Separators};
pub use writer::SegmentWriter;

use thiserror::Error;

/// Lexical failures that stop a document from being split into segments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unterminated segment '{code}' (segment {index}) at line {line}, col {column}")]
    UnterminatedSegment {
        index: usize,
        code: String,
        line: usize,
        column: usize,
    },

    #[error("Conflicting delimiters: {first} and {second} are both '{character}'")]
    ConflictingDelimiters {
        character: char,
        first: &'static str,
        second: &'static str,
    },
}

/// Errors raised by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Cannot write '{character}' in segment {code}: no release character is configured")]
    Unescapable { code: String, character: char },

    #[error("Cannot write repeated field in segment {code}: no repetition separator is configured")]
    RepetitionUnsupported { code: String },

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),
}

impl Error {
    pub fn repetition_unsupported(code: impl Into<String>) -> Self {
        Error::RepetitionUnsupported { code: code.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
