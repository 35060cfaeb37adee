//! Structural guard run on every candidate tree before a transaction commits.
//!
//! Checks that the root is a page container, that every block sits directly
//! inside a page container, that slot-bearing nodes hold exactly their slots,
//! that columns only hold column-eligible kinds, and that nesting stays within
//! [`MAX_NESTING_DEPTH`].

use crate::blocks::{BlockTypeRegistry, ContentRule};
use crate::error::EditorError;
use crate::models::{Node, NodeContent};
use crate::page::MAX_NESTING_DEPTH;

pub fn check(registry: &BlockTypeRegistry, root: &Node) -> Result<(), EditorError> {
    if !registry.is_page_container(&root.kind) {
        return Err(violation(format!(
            "root kind {:?} is not a page container",
            root.kind
        )));
    }
    check_node(registry, root, false, 0)
}

fn check_node(
    registry: &BlockTypeRegistry,
    node: &Node,
    column_slot: bool,
    depth: usize,
) -> Result<(), EditorError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(violation(format!(
            "nesting exceeds {MAX_NESTING_DEPTH} levels"
        )));
    }

    let block_type = registry
        .by_kind(&node.kind)
        .ok_or_else(|| violation(format!("unknown node kind {:?}", node.kind)))?;

    match (block_type.content, &node.content) {
        (ContentRule::Inline { marks }, NodeContent::Inline(runs)) => {
            if !marks && runs.iter().any(|run| !run.marks.is_empty()) {
                return Err(violation(format!("{} does not allow marks", node.kind)));
            }
            Ok(())
        }
        (ContentRule::Atom, NodeContent::Atom) => Ok(()),
        (ContentRule::Blocks, NodeContent::Blocks(children)) => {
            if children.is_empty() {
                return Err(violation(format!("{} must hold at least one block", node.kind)));
            }
            for child in children {
                let child_type = registry
                    .by_kind(&child.kind)
                    .ok_or_else(|| violation(format!("unknown node kind {:?}", child.kind)))?;
                if !child_type.is_block() {
                    return Err(violation(format!(
                        "{} cannot sit directly inside {}",
                        child.kind, node.kind
                    )));
                }
                if column_slot && !registry.column_eligible_kinds().contains(&child.kind) {
                    return Err(violation(format!("{} is not allowed in a column", child.kind)));
                }
                check_node(registry, child, false, depth + 1)?;
            }
            Ok(())
        }
        (ContentRule::Slots(kinds), NodeContent::Blocks(children)) => {
            let actual: Vec<&str> = children.iter().map(|child| child.kind.as_str()).collect();
            if actual != kinds {
                return Err(violation(format!(
                    "{} expects slots {:?}, found {:?}",
                    node.kind, kinds, actual
                )));
            }
            for child in children {
                check_node(registry, child, false, depth + 1)?;
            }
            Ok(())
        }
        (ContentRule::Repeat { kind, min }, NodeContent::Blocks(children)) => {
            if children.len() < min || children.iter().any(|child| child.kind != kind) {
                return Err(violation(format!(
                    "{} expects at least {min} {kind} slots",
                    node.kind
                )));
            }
            for child in children {
                check_node(registry, child, true, depth + 1)?;
            }
            Ok(())
        }
        _ => Err(violation(format!(
            "{} has the wrong content shape",
            node.kind
        ))),
    }
}

fn violation(message: String) -> EditorError {
    EditorError::InvariantViolation(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::catalog::*;
    use crate::models::{InlineRun, Mark};
    use crate::tests::fixtures;
    use rstest::rstest;

    fn assert_rejected(root: Node) {
        let registry = BlockTypeRegistry::standard();
        assert!(matches!(
            check(&registry, &root),
            Err(EditorError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_accepts_mixed_document() {
        let registry = BlockTypeRegistry::standard();
        assert_eq!(check(&registry, &fixtures::mixed_document()), Ok(()));
    }

    #[test]
    fn test_rejects_non_page_container_root() {
        assert_rejected(Node::blocks(QUOTE, vec![Node::text(PARAGRAPH, "x")]));
        assert_rejected(Node::text(PARAGRAPH, "x"));
    }

    #[rstest]
    #[case::paragraph_in_column_layout(Node::blocks(
        COLUMN_LAYOUT,
        vec![Node::text(PARAGRAPH, "a"), Node::text(PARAGRAPH, "b")]
    ))]
    #[case::single_column(Node::blocks(
        COLUMN_LAYOUT,
        vec![Node::blocks(COLUMN, vec![Node::text(PARAGRAPH, "a")])]
    ))]
    #[case::toggle_without_title(Node::blocks(
        TOGGLE,
        vec![Node::blocks(TOGGLE_CONTENT, vec![Node::text(PARAGRAPH, "a")])]
    ))]
    #[case::empty_quote(Node::blocks(QUOTE, vec![]))]
    #[case::slot_as_block(Node::blocks(COLUMN, vec![Node::text(PARAGRAPH, "a")]))]
    #[case::title_as_block(Node::text(TOGGLE_TITLE, "a"))]
    #[case::unknown_kind(Node::text("mystery", "a"))]
    #[case::atom_with_text(Node::text(DIVIDER, "a"))]
    fn test_rejects_misplaced_nodes(#[case] block: Node) {
        assert_rejected(Node::blocks(DOC, vec![block]));
    }

    #[test]
    fn test_rejects_marks_in_code_block() {
        let code = Node::textblock(CODE_BLOCK, vec![InlineRun::marked("x", vec![Mark::Bold])]);
        assert_rejected(Node::blocks(DOC, vec![code]));
    }

    #[test]
    fn test_rejects_column_ineligible_kind() {
        let columns = Node::blocks(
            COLUMN_LAYOUT,
            vec![
                Node::blocks(COLUMN, vec![Node::atom(TABLE)]),
                Node::blocks(COLUMN, vec![Node::text(PARAGRAPH, "b")]),
            ],
        );
        assert_rejected(Node::blocks(DOC, vec![columns]));

        let nested = Node::blocks(
            COLUMN_LAYOUT,
            vec![
                Node::blocks(COLUMN, vec![fixtures::columns(&["a"], &["b"])]),
                Node::blocks(COLUMN, vec![Node::text(PARAGRAPH, "b")]),
            ],
        );
        assert_rejected(Node::blocks(DOC, vec![nested]));
    }

    #[test]
    fn test_rejects_excessive_nesting() {
        let mut node = Node::text(PARAGRAPH, "deep");
        for _ in 0..=MAX_NESTING_DEPTH {
            node = Node::blocks(QUOTE, vec![node]);
        }
        assert_rejected(Node::blocks(DOC, vec![node]));
    }

    #[test]
    fn test_allows_table_in_quote_but_not_in_column() {
        let registry = BlockTypeRegistry::standard();
        let root = Node::blocks(DOC, vec![Node::blocks(QUOTE, vec![Node::atom(TABLE)])]);
        assert_eq!(check(&registry, &root), Ok(()));
    }
}
