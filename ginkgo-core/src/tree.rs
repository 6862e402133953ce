//! Spec Tree with an explicit cursor stack
//!
//! Nested declarations move a cursor into the container being declared and
//! back out again. The cursor is a path of child indices from the root, so
//! entering and leaving are plain stack pushes and pops.

use crate::{CodeLocation, ContainerNode, Flag};
use rand::Rng;

/// Text of the implicit root container
pub const TOP_LEVEL_TEXT: &str = "[Top Level]";

/// Declaration tree plus construction cursor
#[derive(Debug, Clone)]
pub struct SpecTree {
    root: ContainerNode,
    cursor: Vec<usize>,
}

impl Default for SpecTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecTree {
    /// Create a tree holding only the top-level container
    pub fn new() -> Self {
        Self {
            root: ContainerNode::new(TOP_LEVEL_TEXT, Flag::None, CodeLocation::unknown()),
            cursor: Vec::new(),
        }
    }

    /// The top-level container
    pub fn root(&self) -> &ContainerNode {
        &self.root
    }

    /// Nesting depth of the cursor (0 at the top level)
    pub fn depth(&self) -> usize {
        self.cursor.len()
    }

    /// Container the cursor points at
    pub fn current(&self) -> &ContainerNode {
        self.cursor
            .iter()
            .fold(&self.root, |node, &index| &node.children()[index])
    }

    /// Mutable access to the container the cursor points at
    pub fn current_mut(&mut self) -> &mut ContainerNode {
        let mut node = &mut self.root;
        for &index in &self.cursor {
            node = match node.child_mut(index) {
                Some(child) => child,
                None => unreachable!("cursor index {index} outside of container"),
            };
        }
        node
    }

    /// Append `container` to the current container and move the cursor into it
    pub fn enter(&mut self, container: ContainerNode) {
        let index = self.current_mut().push_container_node(container);
        self.cursor.push(index);
    }

    /// Move the cursor back to the parent; returns false at the top level
    pub fn exit(&mut self) -> bool {
        self.cursor.pop().is_some()
    }

    /// Shuffle the whole tree; the cursor must be at the top level
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        debug_assert!(self.cursor.is_empty(), "shuffled while declaring");
        self.root.shuffle(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(text: &str) -> ContainerNode {
        ContainerNode::new(text, Flag::None, CodeLocation::unknown())
    }

    #[test]
    fn test_enter_and_exit() {
        let mut tree = SpecTree::new();
        tree.enter(container("A"));
        tree.enter(container("B"));
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.current().text, "B");

        assert!(tree.exit());
        assert_eq!(tree.current().text, "A");
        tree.enter(container("C"));
        assert!(tree.exit());
        assert!(tree.exit());
        assert!(!tree.exit());

        assert_eq!(tree.current().text, TOP_LEVEL_TEXT);
        let a = &tree.root().children()[0];
        let texts: Vec<&str> = a.children().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["B", "C"]);
    }
}
