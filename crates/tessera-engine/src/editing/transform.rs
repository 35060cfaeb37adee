//! Block type conversion.
//!
//! Every conversion is a single [`Cmd`] so it commits or fails as one
//! transaction. Textblocks sharing an inline model are retyped in place;
//! everything else is rebuilt from the source block's title and body.

use std::sync::Arc;

use super::{Cmd, Document, Patch};
use crate::blocks::{BlockType, BlockTypeRegistry, ContentRule, StructuralKind};
use crate::error::EditorError;
use crate::io::SaveRequests;
use crate::models::node::strip_marks;
use crate::models::{Attrs, InlineRun, Node, NodeContent};

/// The kind and attributes a block should end up with.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetType {
    pub kind: String,
    pub attrs: Attrs,
}

impl TargetType {
    pub fn new(kind: impl Into<String>, attrs: Attrs) -> Self {
        Self {
            kind: kind.into(),
            attrs,
        }
    }

    /// Target carrying the default attributes of `block_type`.
    pub fn of(block_type: &BlockType) -> Self {
        Self::new(block_type.kind, block_type.default_attrs())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    Applied(Patch),
    /// The block already had the target kind and attributes.
    Unchanged,
}

/// Content pulled out of a source block before rebuilding it.
#[derive(Debug, Default)]
struct Parts {
    /// Inline content of a leaf or a title slot.
    title: Option<Vec<InlineRun>>,
    body: Vec<Node>,
}

pub struct BlockTransformer {
    registry: Arc<BlockTypeRegistry>,
}

impl BlockTransformer {
    pub fn new(registry: Arc<BlockTypeRegistry>) -> Self {
        Self { registry }
    }

    /// Converts the block addressed by `address` to `target`.
    ///
    /// On success the serialized document is handed to `saves` once.
    pub fn transform(
        &self,
        doc: &mut Document,
        address: usize,
        target: &TargetType,
        saves: &mut dyn SaveRequests,
    ) -> Result<TransformOutcome, EditorError> {
        let (range, source) = {
            let block = doc.block_at(address)?;
            (block.range(), block.node.clone())
        };

        if source.kind == target.kind && source.attrs == target.attrs {
            return Ok(TransformOutcome::Unchanged);
        }

        let unsupported = || EditorError::ConversionUnsupported {
            from: source.kind.clone(),
            to: target.kind.clone(),
        };
        let target_type = self
            .registry
            .by_kind(&target.kind)
            .filter(|block_type| is_convertible(block_type))
            .ok_or_else(unsupported)?;
        let source_type = self
            .registry
            .by_kind(&source.kind)
            .filter(|block_type| is_convertible(block_type))
            .ok_or_else(unsupported)?;

        let patch = if source_type.is_textblock()
            && target_type.is_textblock()
            && source_type.allows_marks() == target_type.allows_marks()
        {
            let selection = doc.selection();
            let mut patch = doc.apply(Cmd::SetBlockType {
                at: range.start,
                kind: target.kind.clone(),
                attrs: target.attrs.clone(),
            })?;
            doc.set_selection(selection.clone());
            patch.new_selection = selection;
            patch
        } else {
            let parts = self.extract(source_type, source);
            let rebuilt = self.fill(target_type, target, parts);
            doc.apply(Cmd::ReplaceBlocks {
                range,
                nodes: vec![rebuilt],
            })?
        };

        log::debug!(
            "converted block at {} to {} (v{})",
            address,
            target.kind,
            patch.version
        );
        match doc.to_json() {
            Ok(json) => saves.request_save(doc.id(), json),
            Err(err) => log::error!("failed to serialize document {}: {err}", doc.id()),
        }
        Ok(TransformOutcome::Applied(patch))
    }

    fn extract(&self, source_type: &BlockType, source: Node) -> Parts {
        match (source_type.content, source.content) {
            (ContentRule::Inline { .. }, NodeContent::Inline(runs)) => Parts {
                title: Some(runs),
                body: Vec::new(),
            },
            (ContentRule::Slots(_), NodeContent::Blocks(slots)) => {
                let mut parts = Parts::default();
                for slot in slots {
                    match slot.content {
                        NodeContent::Inline(runs) => parts.title = Some(runs),
                        NodeContent::Blocks(children) => parts.body.extend(children),
                        NodeContent::Atom => {}
                    }
                }
                parts
            }
            (_, NodeContent::Blocks(children)) => Parts {
                title: None,
                body: children,
            },
            _ => Parts::default(),
        }
    }

    fn fill(&self, target_type: &BlockType, target: &TargetType, parts: Parts) -> Node {
        let content = match target_type.content {
            ContentRule::Inline { marks } => {
                // Container to leaf keeps only the first inner block.
                let runs = match parts.title {
                    Some(runs) => runs,
                    None => parts.body.first().map(first_inline).unwrap_or_default(),
                };
                NodeContent::Inline(self.inline_for(marks, runs))
            }
            ContentRule::Slots(slots) => {
                let (title, body) = match parts.title {
                    Some(title) => (title, parts.body),
                    None => split_title(parts.body),
                };
                let mut title = Some(title);
                let mut body = Some(body);
                NodeContent::Blocks(
                    slots
                        .iter()
                        .filter_map(|kind| self.registry.by_kind(kind))
                        .map(|slot_type| match slot_type.content {
                            ContentRule::Inline { marks } => Node::textblock(
                                slot_type.kind,
                                self.inline_for(marks, title.take().unwrap_or_default()),
                            ),
                            _ => Node::blocks(
                                slot_type.kind,
                                self.non_empty(body.take().unwrap_or_default()),
                            ),
                        })
                        .collect(),
                )
            }
            _ => {
                let mut children = Vec::with_capacity(parts.body.len() + 1);
                if let Some(title) = parts.title {
                    let mut lead = self.registry.empty_text_block();
                    lead.content = NodeContent::Inline(title);
                    children.push(lead);
                }
                children.extend(parts.body);
                NodeContent::Blocks(self.non_empty(children))
            }
        };

        Node {
            kind: target.kind.clone(),
            attrs: target.attrs.clone(),
            content,
        }
    }

    fn inline_for(&self, marks: bool, runs: Vec<InlineRun>) -> Vec<InlineRun> {
        if marks { runs } else { strip_marks(&runs) }
    }

    fn non_empty(&self, blocks: Vec<Node>) -> Vec<Node> {
        if blocks.is_empty() {
            vec![self.registry.empty_text_block()]
        } else {
            blocks
        }
    }
}

/// Leaves and containers convert; atoms, slots and layout wrappers do not.
fn is_convertible(block_type: &BlockType) -> bool {
    match block_type.structure {
        StructuralKind::Leaf => block_type.is_textblock(),
        StructuralKind::Container => true,
        StructuralKind::Atom | StructuralKind::Inline | StructuralKind::Structural => false,
    }
}

/// Inline content of the first textblock in `node`'s subtree.
fn first_inline(node: &Node) -> Vec<InlineRun> {
    match &node.content {
        NodeContent::Inline(runs) => runs.clone(),
        NodeContent::Blocks(children) => children.first().map(first_inline).unwrap_or_default(),
        NodeContent::Atom => Vec::new(),
    }
}

/// Uses a leading textblock as the title; anything else stays in the body.
fn split_title(mut body: Vec<Node>) -> (Vec<InlineRun>, Vec<Node>) {
    match body.first() {
        Some(first) if first.is_textblock() => {
            let first = body.remove(0);
            (first.inline().to_vec(), body)
        }
        _ => (Vec::new(), body),
    }
}
