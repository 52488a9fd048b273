//! # edi-schema
//!
//! Grammar model, loader and registry for EDI message types.
//!
//! A grammar describes one message type and version: the nested structural
//! rules (which segments may appear, in which order, how often) and the
//! field rules of every segment's record. Grammars are data, loaded from
//! JSON or YAML files and shared immutably between parses.

pub mod loader;
pub mod model;
pub mod references;
pub mod registry;

pub use loader::GrammarLoader;
pub use model::{DataType, FieldRule, Grammar, Qualifier, StructuralRule};
pub use registry::GrammarRegistry;

use thiserror::Error;

/// Errors that can occur when working with grammars
#[derive(Error, Debug)]
pub enum Error {
    #[error("Grammar not found: {message_type} {version}")]
    GrammarNotFound {
        message_type: String,
        version: String,
    },

    #[error("Invalid grammar definition: {0}")]
    InvalidGrammarDefinition(String),

    #[error("Invalid grammar format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn grammar_not_found(message_type: impl Into<String>, version: impl Into<String>) -> Self {
        Error::GrammarNotFound {
            message_type: message_type.into(),
            version: version.into(),
        }
    }

    pub fn invalid_grammar(msg: impl Into<String>) -> Self {
        Error::InvalidGrammarDefinition(msg.into())
    }

    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Error::InvalidFormat(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
