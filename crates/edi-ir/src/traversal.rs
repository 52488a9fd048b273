//! Traversal and cursor APIs for navigating the parse tree

use crate::Error;
use crate::Result;
use crate::node::Node;

/// A cursor for navigating the parse tree
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    /// Current node
    node: &'a Node,

    /// Path to current node (for error reporting)
    path: Vec<String>,
}

/// Trait for traversing the parse tree
pub trait Traversal {
    /// Visit a node
    fn visit(&mut self, node: &Node, path: &[String]);

    /// Called when entering a node with children
    fn enter(&mut self, _node: &Node, _path: &[String]) {}

    /// Called when leaving a node with children
    fn leave(&mut self, _node: &Node, _path: &[String]) {}

    /// Returns true if traversal should continue
    fn should_continue(&self) -> bool {
        true
    }
}

impl<'a> Cursor<'a> {
    /// Create a new cursor at the given node
    #[must_use]
    pub fn new(node: &'a Node) -> Self {
        Self {
            node,
            path: vec![node.name.clone()],
        }
    }

    /// Get the current node
    #[must_use]
    pub fn node(&self) -> &'a Node {
        self.node
    }

    /// Get the current path
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Navigate to the first child with the given name
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] when no child has that name.
    pub fn child(&self, name: &str) -> Result<Cursor<'a>> {
        match self.node.find_child(name) {
            Some(child) => Ok(self.descend(child, name.to_string())),
            None => Err(Error::node_not_found(format!(
                "{}/{}",
                self.path.join("/"),
                name
            ))),
        }
    }

    /// Navigate to a child by index
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] when the index is out of range.
    pub fn child_at(&self, index: usize) -> Result<Cursor<'a>> {
        match self.node.children.get(index) {
            Some(child) => Ok(self.descend(child, format!("[{index}]"))),
            None => Err(Error::node_not_found(format!(
                "{}[{}]",
                self.path.join("/"),
                index
            ))),
        }
    }

    /// Get all children matching a name
    #[must_use]
    pub fn children(&self, name: &str) -> Vec<Cursor<'a>> {
        self.node
            .find_children(name)
            .into_iter()
            .enumerate()
            .map(|(idx, child)| self.descend(child, format!("{name}[{idx}]")))
            .collect()
    }

    /// Navigate using a path (e.g., "ISA/GS/ST[1]/2000A/NM1")
    ///
    /// A bare name selects the first child with that name, `NAME[n]` selects
    /// the n-th (0-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] for malformed indexes and
    /// [`Error::NodeNotFound`] when a step does not resolve.
    pub fn navigate(&self, path: &str) -> Result<Cursor<'a>> {
        let mut current_node = self.node;
        let mut current_path = self.path.clone();

        for step in path.split('/') {
            if step.is_empty() {
                continue;
            }

            if let Some(open_bracket) = step.find('[') {
                let name = &step[..open_bracket];
                let close_bracket = step
                    .find(']')
                    .ok_or_else(|| Error::invalid_path(path, format!("unclosed bracket in '{step}'")))?;
                let index: usize = step[open_bracket + 1..close_bracket]
                    .parse()
                    .map_err(|_| Error::invalid_path(path, format!("invalid index in '{step}'")))?;

                current_node = current_node
                    .children
                    .iter()
                    .filter(|c| c.name == name)
                    .nth(index)
                    .ok_or_else(|| {
                        Error::node_not_found(format!("{}/{}", current_path.join("/"), step))
                    })?;
                current_path.push(format!("{name}[{index}]"));
            } else {
                current_node = current_node.find_child(step).ok_or_else(|| {
                    Error::node_not_found(format!("{}/{}", current_path.join("/"), step))
                })?;
                current_path.push(step.to_string());
            }
        }

        Ok(Cursor {
            node: current_node,
            path: current_path,
        })
    }

    fn descend(&self, child: &'a Node, step: String) -> Cursor<'a> {
        let mut path = self.path.clone();
        path.push(step);
        Cursor { node: child, path }
    }
}

/// Walk the tree using a visitor
pub fn walk<T: Traversal>(node: &Node, visitor: &mut T) {
    walk_recursive(node, visitor, &mut vec![]);
}

fn walk_recursive<T: Traversal>(node: &Node, visitor: &mut T, path: &mut Vec<String>) {
    if !visitor.should_continue() {
        return;
    }

    visitor.visit(node, path);

    if !node.children.is_empty() {
        visitor.enter(node, path);
        path.push(node.name.clone());

        for child in &node.children {
            walk_recursive(child, visitor, path);
        }

        path.pop();
        visitor.leave(node, path);
    }
}

/// Pre-order iterator over the nodes below a node
///
/// Since every non-root node stands for one segment, the iteration order is
/// the order in which the segments appeared in the input.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Segments<'a> {
    /// Iterate the subtree below `node`, excluding `node` itself
    #[must_use]
    pub fn new(node: &'a Node) -> Self {
        Self {
            stack: node.children.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
