//! Group reference tracking
//!
//! Grammar files may declare named groups and reference them from any child
//! list. The graph below records "group A references group B" edges while a
//! file is converted, so that cyclic references are rejected before any
//! expansion happens.

use std::collections::HashSet;

/// Tracks reference relationships to detect cycles
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    edges: Vec<(String, String)>, // (from, to)
}

impl ReferenceGraph {
    #[must_use]
    pub fn new() -> Self {
        Self { edges: Vec::new() }
    }

    /// Record that `from` references `to`
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.push((from.into(), to.into()));
    }

    /// Detect if adding this edge would create a cycle
    #[must_use]
    pub fn would_create_cycle(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        // Check if `to` already reaches `from` (directly or transitively)
        let mut to_visit = vec![to.to_string()];
        let mut visited = HashSet::new();

        while let Some(current) = to_visit.pop() {
            if current == from {
                return true;
            }
            if visited.insert(current.clone()) {
                for (f, t) in &self.edges {
                    if f == &current {
                        to_visit.push(t.clone());
                    }
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_reference() {
        let graph = ReferenceGraph::new();
        assert!(graph.would_create_cycle("2000A", "2000A"));
    }

    #[test]
    fn test_transitive_cycle() {
        let mut graph = ReferenceGraph::new();
        graph.add_edge("2000A", "2010AA");
        graph.add_edge("2010AA", "2300");

        assert!(graph.would_create_cycle("2300", "2000A"));
        assert!(!graph.would_create_cycle("2000A", "2300"));
        assert!(!graph.would_create_cycle("2400", "2300"));
    }
}
