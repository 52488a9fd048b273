//! # edi-parser
//!
//! Grammar-driven parsing of EDI documents.
//!
//! Raw input is lexed into segments, each segment is placed in the
//! grammar's structural tree and its fields are validated against the
//! segment's record definition. The result is a [`Document`](edi_ir::Document)
//! together with every finding made along the way.
//!
//! ## Example
//!
//! ```rust
//! use edi_lexer::DialectConfig;
//! use edi_parser::parse;
//! use edi_schema::{Grammar, StructuralRule};
//! use edi_validation::ValidationMode;
//!
//! let grammar = Grammar::new("ORDERS", "D96A")
//!     .with_rule(StructuralRule::segment("UNH").mandatory())
//!     .with_rule(StructuralRule::segment("BGM").mandatory())
//!     .with_rule(StructuralRule::segment("UNT").mandatory());
//!
//! let result = parse(
//!     b"UNH+1'BGM+220'UNT+3+1'",
//!     &DialectConfig::edifact(),
//!     &grammar,
//!     ValidationMode::Strict,
//! );
//!
//! assert!(result.success);
//! assert_eq!(result.document.segment_count(), 3);
//! ```

#![deny(rust_2018_idioms)]
#![warn(clippy::all)]

pub mod generate;
mod matcher;
pub mod parser;

pub use generate::{generate, generate_document};
pub use parser::{
    ParseOptions, ParseResult, ParseStats, Parser, parse, parse_with_registry, validate,
};

use thiserror::Error;

/// Errors raised around parsing
///
/// Parsing itself never fails: findings are reported in the
/// [`ParseResult`]. These errors come from grammar lookup and from
/// rendering generated documents.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Grammar error: {0}")]
    Grammar(#[from] edi_schema::Error),

    #[error("Write error: {0}")]
    Write(#[from] edi_lexer::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
