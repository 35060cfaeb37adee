use std::ops::Range;

use crate::error::EditorError;
use crate::models::node::{delete_text, insert_text};
use crate::models::{Attrs, Node, ResolvedPos};

/// An edit to the document tree.
///
/// Positions follow the linear content model. Block ranges must start and end
/// on child boundaries of the same parent.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText { at: usize, text: String },
    DeleteText { range: Range<usize> },
    InsertBlocks { at: usize, nodes: Vec<Node> },
    DeleteBlocks { range: Range<usize> },
    ReplaceBlocks { range: Range<usize>, nodes: Vec<Node> },
    /// Moves the blocks in `range` to `to`, a boundary outside the range
    /// given in pre-move coordinates.
    MoveBlocks { range: Range<usize>, to: usize },
    /// Changes the kind and attributes of the block at `at`, keeping content.
    SetBlockType { at: usize, kind: String, attrs: Attrs },
    /// Merges `attrs` into the attributes of the block at `at`.
    SetAttrs { at: usize, attrs: Attrs },
}

/// What one executed command touched.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub changed: Range<usize>,
    pub selection: Range<usize>,
}

impl Cmd {
    /// Runs the command against `root` in place. The caller owns validation of
    /// the resulting tree.
    pub(crate) fn execute(&self, root: &mut Node) -> Result<Step, EditorError> {
        match self {
            Cmd::InsertText { at, text } => {
                let (path, offset) = text_target(root, *at)?;
                let runs = inline_at(root, &path, *at)?;
                insert_text(runs, offset, text);
                let end = at + text.chars().count();
                Ok(Step {
                    changed: *at..end,
                    selection: end..end,
                })
            }
            Cmd::DeleteText { range } => {
                let (path, from) = text_target(root, range.start)?;
                let (end_path, to) = text_target(root, range.end)?;
                if path != end_path || from > to {
                    return Err(EditorError::InvalidPosition { pos: range.end });
                }
                let runs = inline_at(root, &path, range.start)?;
                delete_text(runs, from, to);
                Ok(Step {
                    changed: range.start..range.start,
                    selection: range.start..range.start,
                })
            }
            Cmd::InsertBlocks { at, nodes } => {
                let inserted = insert_blocks(root, *at, nodes.clone())?;
                Ok(Step {
                    changed: *at..at + inserted,
                    selection: block_selection(*at, nodes),
                })
            }
            Cmd::DeleteBlocks { range } => {
                remove_blocks(root, range.clone())?;
                Ok(Step {
                    changed: range.start..range.start,
                    selection: range.start..range.start,
                })
            }
            Cmd::ReplaceBlocks { range, nodes } => {
                remove_blocks(root, range.clone())?;
                let inserted = insert_blocks(root, range.start, nodes.clone())?;
                Ok(Step {
                    changed: range.start..range.start + inserted,
                    selection: block_selection(range.start, nodes),
                })
            }
            Cmd::MoveBlocks { range, to } => {
                if *to > range.start && *to < range.end {
                    return Err(EditorError::InvalidPosition { pos: *to });
                }
                let moved = remove_blocks(root, range.clone())?;
                let len = range.end - range.start;
                let target = if *to >= range.end { to - len } else { *to };
                insert_blocks(root, target, moved.clone())?;
                let low = range.start.min(target);
                let high = (range.end).max(target + len);
                Ok(Step {
                    changed: low..high,
                    selection: block_selection(target, &moved),
                })
            }
            Cmd::SetBlockType { at, kind, attrs } => {
                let node = block_at_mut(root, *at)?;
                node.kind = kind.clone();
                node.attrs = attrs.clone();
                let size = node.node_size();
                Ok(Step {
                    changed: *at..at + size,
                    selection: block_selection(*at, std::slice::from_ref(&*node)),
                })
            }
            Cmd::SetAttrs { at, attrs } => {
                let node = block_at_mut(root, *at)?;
                for (key, value) in attrs {
                    node.attrs.insert(key.clone(), value.clone());
                }
                let size = node.node_size();
                Ok(Step {
                    changed: *at..at + size,
                    selection: *at..*at,
                })
            }
        }
    }
}

/// Path to the textblock containing `pos` and the char offset inside it.
fn text_target(root: &Node, pos: usize) -> Result<(Vec<usize>, usize), EditorError> {
    let rp = ResolvedPos::resolve(root, pos).ok_or(EditorError::InvalidPosition { pos })?;
    let depth = rp.depth();
    if depth == 0 || !rp.node(depth).is_textblock() {
        return Err(EditorError::InvalidPosition { pos });
    }
    Ok((rp.path(depth), rp.parent_offset()))
}

fn inline_at<'a>(
    root: &'a mut Node,
    path: &[usize],
    pos: usize,
) -> Result<&'a mut Vec<crate::models::InlineRun>, EditorError> {
    root.descendant_mut(path)
        .and_then(Node::inline_mut)
        .ok_or(EditorError::InvalidPosition { pos })
}

/// Parent path and child index of the boundary at `pos`.
fn boundary(root: &Node, pos: usize) -> Result<(Vec<usize>, usize), EditorError> {
    let rp = ResolvedPos::resolve(root, pos).ok_or(EditorError::InvalidPosition { pos })?;
    if !rp.at_child_boundary() {
        return Err(EditorError::InvalidPosition { pos });
    }
    let depth = rp.depth();
    Ok((rp.path(depth), rp.index(depth)))
}

fn insert_blocks(root: &mut Node, at: usize, nodes: Vec<Node>) -> Result<usize, EditorError> {
    let (path, index) = boundary(root, at)?;
    let size = nodes.iter().map(Node::node_size).sum();
    let children = root
        .descendant_mut(&path)
        .and_then(Node::children_mut)
        .ok_or(EditorError::InvalidPosition { pos: at })?;
    children.splice(index..index, nodes);
    Ok(size)
}

fn remove_blocks(root: &mut Node, range: Range<usize>) -> Result<Vec<Node>, EditorError> {
    let (path, start) = boundary(root, range.start)?;
    let children = root
        .descendant_mut(&path)
        .and_then(Node::children_mut)
        .ok_or(EditorError::InvalidPosition { pos: range.start })?;

    let mut end = start;
    let mut pos = range.start;
    while pos < range.end {
        let child = children
            .get(end)
            .ok_or(EditorError::InvalidPosition { pos: range.end })?;
        pos += child.node_size();
        end += 1;
    }
    if pos != range.end {
        return Err(EditorError::InvalidPosition { pos: range.end });
    }
    Ok(children.drain(start..end).collect())
}

fn block_at_mut(root: &mut Node, at: usize) -> Result<&mut Node, EditorError> {
    let (mut path, index) = boundary(root, at)?;
    path.push(index);
    root.descendant_mut(&path)
        .ok_or(EditorError::InvalidPosition { pos: at })
}

/// Caret at the first text position of `nodes` placed at `at`, or at `at`.
fn block_selection(at: usize, nodes: &[Node]) -> Range<usize> {
    let mut offset = at;
    for node in nodes {
        if let Some(inner) = node.first_text_offset() {
            let caret = offset + inner;
            return caret..caret;
        }
        offset += node.node_size();
    }
    at..at
}
