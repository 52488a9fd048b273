//! Document representation for a parsed message
#![allow(clippy::must_use_candidate)] // Builder/constructor API intentionally omits pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use crate::metadata::SourceInfo;
use crate::node::Node;
use crate::traversal::Segments;
use serde::{Deserialize, Serialize};

/// A parsed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Root node of the document
    pub root: Node,

    /// Document-level metadata
    pub metadata: DocumentMetadata,
}

/// Metadata associated with a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source information (file, position, etc.)
    pub source: Option<SourceInfo>,

    /// Message type of the grammar the document was parsed with
    pub message_type: Option<String>,

    /// Version of the grammar the document was parsed with
    pub version: Option<String>,
}

impl Document {
    /// Create a new document with the given root node
    pub fn new(root: Node) -> Self {
        Self {
            root,
            metadata: DocumentMetadata::default(),
        }
    }

    /// Create a new document with metadata
    pub fn with_metadata(root: Node, metadata: DocumentMetadata) -> Self {
        Self { root, metadata }
    }

    /// Set the source information
    pub fn with_source(mut self, source: SourceInfo) -> Self {
        self.metadata.source = Some(source);
        self
    }

    /// Segment nodes in input order
    pub fn segments(&self) -> Segments<'_> {
        Segments::new(&self.root)
    }

    /// Number of segment nodes in the tree
    pub fn segment_count(&self) -> usize {
        self.root.segment_count()
    }
}
