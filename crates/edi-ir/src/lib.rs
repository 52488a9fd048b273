#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-ir
//!
//! Data structures shared by every stage of EDI parsing.
//!
//! The lexer produces [`RawSegment`]s, the structural matcher turns them into
//! a tree of [`Node`]s held by a [`Document`], and the field validator fills
//! each node with typed [`Field`]s. Nothing in this crate knows about
//! dialects or grammars.

/// Document container and top-level metadata.
pub mod document;
/// Source positions and severity levels.
pub mod metadata;
/// Parse tree nodes, fields and typed values.
pub mod node;
/// Lexed segments before any structural or field validation.
pub mod segment;
/// Cursor-based navigation and visitor traversal over parse trees.
pub mod traversal;

pub use document::{Document, DocumentMetadata};
pub use metadata::{Position, Severity, SourceInfo};
pub use node::{Field, FieldStatus, Node, NodeType, Value};
pub use segment::{RawField, RawSegment};
pub use traversal::{Cursor, Segments, Traversal, walk};

use thiserror::Error;

/// Errors that can occur when navigating the parse tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Node not found at path: {path}")]
    NodeNotFound { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl Error {
    /// Build a node-not-found error with path context.
    pub fn node_not_found(path: impl Into<String>) -> Self {
        Self::NodeNotFound { path: path.into() }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for IR operations.
pub type Result<T> = std::result::Result<T, Error>;
