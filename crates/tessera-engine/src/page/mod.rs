//! # Page Containers
//!
//! A page container is a node whose direct children are individually
//! addressable blocks. The root is always one; so are quotes, callouts, toggle
//! bodies and columns. Given any position, the addressed block is the child of
//! the deepest page container on the ancestor chain.

use crate::blocks::BlockTypeRegistry;
use crate::error::EditorError;
use crate::models::{Node, ResolvedPos};

/// Maximum supported nesting depth of the document tree.
///
/// Depth resolution passes through layout wrappers at most this many times,
/// and the structural guard rejects trees nested deeper than this. Hitting the
/// bound means the tree is corrupt, not that it is legitimately deep.
pub const MAX_NESTING_DEPTH: usize = 32;

/// A block found by depth resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBlock<'a> {
    /// Position directly before the block.
    pub address: usize,
    pub node: &'a Node,
    /// Tree depth of the block (children of the root are depth 1).
    pub depth: usize,
    /// Child indices from the root to the block.
    pub path: Vec<usize>,
}

impl ResolvedBlock<'_> {
    /// Range the block occupies in the linear content model.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.address..self.address + self.node.node_size()
    }
}

/// Depth resolution over the page-container kinds of a registry.
#[derive(Debug, Clone, Copy)]
pub struct PageContainerModel<'r> {
    registry: &'r BlockTypeRegistry,
}

impl<'r> PageContainerModel<'r> {
    pub fn new(registry: &'r BlockTypeRegistry) -> Self {
        Self { registry }
    }

    /// Depth of the deepest ancestor that is a page container (root = 0).
    pub fn container_depth(&self, rp: &ResolvedPos<'_>) -> usize {
        (0..=rp.depth())
            .rev()
            .find(|&depth| self.registry.is_page_container(&rp.node(depth).kind))
            .unwrap_or(0)
    }

    /// Resolves `pos` to the block it addresses.
    ///
    /// A position at a child boundary addresses the block starting there; a
    /// position at the end of a container's content names the container
    /// itself. Positions directly inside a layout wrapper pass through to the
    /// wrapper's first page-container slot.
    pub fn resolve_block<'a>(
        &self,
        root: &'a Node,
        pos: usize,
    ) -> Result<ResolvedBlock<'a>, EditorError> {
        let mut query = pos;

        for _ in 0..MAX_NESTING_DEPTH {
            let rp = ResolvedPos::resolve(root, query).ok_or(EditorError::InvalidPosition { pos })?;
            let container_depth = self.container_depth(&rp);
            let block_depth = container_depth + 1;

            if rp.depth() < block_depth {
                if let Some(node) = rp.node_after() {
                    return Ok(ResolvedBlock {
                        address: query,
                        node,
                        depth: block_depth,
                        path: rp.path_after(),
                    });
                }
                if container_depth == 0 {
                    return Err(EditorError::ResolutionFailure { pos });
                }
                return Ok(ResolvedBlock {
                    address: rp.before(container_depth),
                    node: rp.node(container_depth),
                    depth: container_depth,
                    path: rp.path(container_depth),
                });
            }

            let node = rp.node(block_depth);
            let passes_through = rp.depth() == block_depth
                && self
                    .registry
                    .by_kind(&node.kind)
                    .is_some_and(|block_type| block_type.is_pass_through());

            if passes_through {
                query = self
                    .first_slot_start(rp.before(block_depth), node)
                    .ok_or(EditorError::ResolutionFailure { pos })?;
                continue;
            }

            return Ok(ResolvedBlock {
                address: rp.before(block_depth),
                node,
                depth: block_depth,
                path: rp.path(block_depth),
            });
        }

        Err(EditorError::InvariantViolation(format!(
            "position {pos} nests deeper than {MAX_NESTING_DEPTH} levels"
        )))
    }

    /// Content start of the first page-container slot of `wrapper`.
    fn first_slot_start(&self, wrapper_address: usize, wrapper: &Node) -> Option<usize> {
        let mut offset = wrapper_address + 1;
        for slot in wrapper.children() {
            if self.registry.is_page_container(&slot.kind) {
                return Some(offset + 1);
            }
            offset += slot.node_size();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::catalog::*;
    use crate::tests::fixtures;

    #[test]
    fn test_block_address_resolves_to_block() {
        let registry = BlockTypeRegistry::standard();
        let model = PageContainerModel::new(&registry);
        let root = fixtures::mixed_document();

        // Every top-level block's address resolves to that block
        let mut address = 0;
        for (i, child) in root.children().iter().enumerate() {
            let block = model.resolve_block(&root, address).unwrap();
            assert_eq!(block.node, child);
            assert_eq!(block.depth, 1);
            assert_eq!(block.path, vec![i]);
            address += child.node_size();
        }
    }

    #[test]
    fn test_text_position_resolves_to_enclosing_leaf() {
        let registry = BlockTypeRegistry::standard();
        let model = PageContainerModel::new(&registry);
        // quote(paragraph "inside")
        let root = Node::blocks(
            DOC,
            vec![Node::blocks(QUOTE, vec![Node::text(PARAGRAPH, "inside")])],
        );

        let block = model.resolve_block(&root, 4).unwrap();
        assert_eq!(block.node.kind, PARAGRAPH);
        assert_eq!(block.address, 1);
        assert_eq!(block.depth, 2);
    }

    #[test]
    fn test_end_of_nested_container_names_the_container() {
        let registry = BlockTypeRegistry::standard();
        let model = PageContainerModel::new(&registry);
        let root = Node::blocks(
            DOC,
            vec![Node::blocks(QUOTE, vec![Node::text(PARAGRAPH, "ab")])],
        );

        // quote content ends at 5 (paragraph 1..5)
        let block = model.resolve_block(&root, 5).unwrap();
        assert_eq!(block.node.kind, QUOTE);
        assert_eq!(block.address, 0);
    }

    #[test]
    fn test_end_of_root_is_a_resolution_failure() {
        let registry = BlockTypeRegistry::standard();
        let model = PageContainerModel::new(&registry);
        let root = Node::blocks(DOC, vec![Node::text(PARAGRAPH, "ab")]);

        assert_eq!(
            model.resolve_block(&root, root.content_size()),
            Err(EditorError::ResolutionFailure { pos: 4 })
        );
        assert_eq!(
            model.resolve_block(&root, 99),
            Err(EditorError::InvalidPosition { pos: 99 })
        );
    }

    #[test]
    fn test_toggle_title_resolves_to_toggle() {
        let registry = BlockTypeRegistry::standard();
        let model = PageContainerModel::new(&registry);
        let root = Node::blocks(DOC, vec![fixtures::toggle("Title", &["Body"])]);

        // toggle 0, title 1..8, inside title at 3
        let block = model.resolve_block(&root, 3).unwrap();
        assert_eq!(block.node.kind, TOGGLE);

        // body paragraph: title ends at 8, content slot opens at 8, paragraph at 9
        let block = model.resolve_block(&root, 11).unwrap();
        assert_eq!(block.node.kind, PARAGRAPH);
        assert_eq!(block.address, 9);
        assert_eq!(block.depth, 3);
    }

    #[test]
    fn test_position_inside_column_layout_passes_through_to_first_column() {
        let registry = BlockTypeRegistry::standard();
        let model = PageContainerModel::new(&registry);
        let root = Node::blocks(DOC, vec![fixtures::columns(&["left"], &["right"])]);

        // Wrapper address names the wrapper
        let wrapper = model.resolve_block(&root, 0).unwrap();
        assert_eq!(wrapper.node.kind, COLUMN_LAYOUT);

        // Position 1 sits between the wrapper's slots
        let block = model.resolve_block(&root, 1).unwrap();
        assert_eq!(block.node.plain_text(), "left");
        assert_eq!(block.depth, 3);
        assert_eq!(block.path, vec![0, 0, 0]);
    }

    #[test]
    fn test_position_inside_second_column_resolves_there() {
        let registry = BlockTypeRegistry::standard();
        let model = PageContainerModel::new(&registry);
        let root = Node::blocks(DOC, vec![fixtures::columns(&["left"], &["right"])]);

        // column 1 spans 1..9, column 2 opens at 9, paragraph "right" at 10
        let block = model.resolve_block(&root, 12).unwrap();
        assert_eq!(block.node.plain_text(), "right");
        assert_eq!(block.address, 10);
    }
}
