//! Grammar registry
//!
//! Loaded grammars are immutable and shared as `Arc<Grammar>`, so any number
//! of parses can read them concurrently. The cache itself is a `DashMap`,
//! which lets several threads register or load grammars without a global
//! lock.

use crate::loader::GrammarLoader;
use crate::model::{Grammar, registry_key};
use crate::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Thread-safe cache of grammars keyed by message type and version
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    grammars: DashMap<String, Arc<Grammar>>,
    loader: Option<GrammarLoader>,
}

impl GrammarRegistry {
    /// Create a new empty registry without a loader
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that falls back to loading grammar files
    #[must_use]
    pub fn with_loader(loader: GrammarLoader) -> Self {
        Self {
            grammars: DashMap::new(),
            loader: Some(loader),
        }
    }

    /// Check and cache a grammar, replacing any grammar with the same key
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGrammarDefinition`] when the grammar fails
    /// its checks; nothing is cached in that case.
    pub fn register(&self, grammar: Grammar) -> Result<Arc<Grammar>> {
        grammar.check()?;
        let grammar = Arc::new(grammar);
        debug!(key = %grammar.key(), "registered grammar");
        self.grammars.insert(grammar.key(), Arc::clone(&grammar));
        Ok(grammar)
    }

    /// Get a cached grammar
    #[must_use]
    pub fn get(&self, message_type: &str, version: &str) -> Option<Arc<Grammar>> {
        self.grammars
            .get(&registry_key(message_type, version))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Get a grammar, loading and caching it on a miss
    ///
    /// # Errors
    ///
    /// Returns [`Error::GrammarNotFound`] when the pair is neither cached nor
    /// loadable, and any loader error for a file that exists but is invalid.
    pub fn load(&self, message_type: &str, version: &str) -> Result<Arc<Grammar>> {
        if let Some(cached) = self.get(message_type, version) {
            debug!(message_type, version, "cache hit for grammar");
            return Ok(cached);
        }

        trace!(message_type, version, "cache miss for grammar");

        let Some(loader) = &self.loader else {
            return Err(Error::grammar_not_found(message_type, version));
        };

        let grammar = loader.load(message_type, version)?;
        let key = grammar.key();

        // A concurrent load of the same key may have won; keep its instance.
        let entry = self
            .grammars
            .entry(key)
            .or_insert_with(|| Arc::new(grammar));
        Ok(Arc::clone(entry.value()))
    }

    /// Check if a grammar is cached
    #[must_use]
    pub fn contains(&self, message_type: &str, version: &str) -> bool {
        self.grammars
            .contains_key(&registry_key(message_type, version))
    }

    /// Number of cached grammars
    #[must_use]
    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}
