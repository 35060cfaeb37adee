use std::fmt;
use std::fmt::Write as _;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::Step;
use super::{Cmd, Patch, guard};
use crate::blocks::BlockTypeRegistry;
use crate::blocks::catalog::DOC;
use crate::error::EditorError;
use crate::models::{Node, ResolvedPos};
use crate::page::{PageContainerModel, ResolvedBlock};

/// Stable identity of a document across saves and drag gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One addressable block in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    pub address: usize,
    pub depth: usize,
    pub kind: String,
    pub text: String,
}

#[derive(Serialize)]
struct StoredRef<'a> {
    id: DocumentId,
    root: &'a Node,
}

#[derive(Deserialize)]
struct Stored {
    id: DocumentId,
    root: Node,
}

/// A block document: the node tree plus selection and version.
///
/// Every mutation goes through [`Document::apply`], which runs the command on
/// a copy of the tree and commits it only if the structural guard accepts the
/// result. A rejected command leaves the document untouched.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    root: Node,
    selection: Range<usize>,
    version: u64,
    registry: Arc<BlockTypeRegistry>,
}

impl Document {
    /// An empty document holding one empty paragraph.
    pub fn new(registry: Arc<BlockTypeRegistry>) -> Self {
        let root = Node::blocks(DOC, vec![registry.empty_text_block()]);
        Self {
            id: DocumentId::new(),
            root,
            selection: 1..1,
            version: 0,
            registry,
        }
    }

    /// Wraps an existing tree after checking it against the guard.
    pub fn from_root(registry: Arc<BlockTypeRegistry>, root: Node) -> Result<Self, EditorError> {
        guard::check(&registry, &root)?;
        let caret = root.first_text_offset().map(|offset| offset - 1).unwrap_or(0);
        Ok(Self {
            id: DocumentId::new(),
            root,
            selection: caret..caret,
            version: 0,
            registry,
        })
    }

    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = id;
        self
    }

    /// Parses the stored JSON form `{ "id": ..., "root": ... }`.
    pub fn from_json(registry: Arc<BlockTypeRegistry>, json: &str) -> anyhow::Result<Self> {
        let stored: Stored = serde_json::from_str(json)?;
        Ok(Self::from_root(registry, stored.root)?.with_id(stored.id))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&StoredRef {
            id: self.id,
            root: &self.root,
        })
    }

    /// Apply a command as one transaction.
    ///
    /// The command runs against a copy of the tree; the copy replaces the
    /// current tree only when it passes the structural guard. The version is
    /// bumped and the selection moved on success.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, EditorError> {
        let (candidate, step) = self.candidate(&cmd)?;

        self.root = candidate;
        self.version += 1;
        self.selection = step.selection;

        Ok(Patch {
            changed: vec![step.changed],
            new_selection: self.selection.clone(),
            version: self.version,
        })
    }

    /// Whether `cmd` would commit, without committing it.
    pub fn check(&self, cmd: &Cmd) -> Result<(), EditorError> {
        self.candidate(cmd).map(|_| ())
    }

    fn candidate(&self, cmd: &Cmd) -> Result<(Node, Step), EditorError> {
        let mut candidate = self.root.clone();
        let step = cmd.execute(&mut candidate)?;

        if let Err(err) = guard::check(&self.registry, &candidate) {
            log::debug!("rejected {cmd:?}: {err}");
            return Err(err);
        }
        Ok((candidate, step))
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn registry(&self) -> &Arc<BlockTypeRegistry> {
        &self.registry
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    pub fn set_selection(&mut self, selection: Range<usize>) {
        self.selection = selection;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Size of the root's content; valid positions are `0..=content_size()`.
    pub fn content_size(&self) -> usize {
        self.root.content_size()
    }

    pub fn resolve(&self, pos: usize) -> Option<ResolvedPos<'_>> {
        ResolvedPos::resolve(&self.root, pos)
    }

    /// The block addressed by `pos`.
    pub fn block_at(&self, pos: usize) -> Result<ResolvedBlock<'_>, EditorError> {
        PageContainerModel::new(&self.registry).resolve_block(&self.root, pos)
    }

    /// Every addressable block in document order, nested blocks included.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        let mut entries = Vec::new();
        self.collect_outline(&self.root, 0, 0, &mut entries);
        entries
    }

    fn collect_outline(
        &self,
        node: &Node,
        content_start: usize,
        depth: usize,
        entries: &mut Vec<OutlineEntry>,
    ) {
        let in_container = self.registry.is_page_container(&node.kind);
        let mut address = content_start;
        for child in node.children() {
            let is_block = self
                .registry
                .by_kind(&child.kind)
                .is_some_and(|block_type| block_type.is_block());
            if in_container && is_block {
                entries.push(OutlineEntry {
                    address,
                    depth: depth + 1,
                    kind: child.kind.clone(),
                    text: child.plain_text(),
                });
            }
            self.collect_outline(child, address + 1, depth + 1, entries);
            address += child.node_size();
        }
    }

    /// Indented text rendering of [`outline`](Self::outline), one block per line.
    pub fn format_outline(&self) -> String {
        let mut out = String::new();
        for entry in self.outline() {
            let indent = "  ".repeat(entry.depth.saturating_sub(1));
            let _ = write!(out, "{indent}{}@{}", entry.kind, entry.address);
            if !entry.text.is_empty() {
                let _ = write!(out, " {:?}", entry.text);
            }
            out.push('\n');
        }
        out
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.root == other.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::catalog::*;
    use crate::tests::fixtures;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_document_has_one_empty_paragraph() {
        let doc = Document::new(BlockTypeRegistry::standard());
        assert_eq!(doc.root().children(), &[Node::text(PARAGRAPH, "")]);
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.selection(), 1..1);
    }

    #[test]
    fn test_apply_bumps_version_and_moves_selection() {
        let mut doc = Document::new(BlockTypeRegistry::standard());

        let patch = doc
            .apply(Cmd::InsertText {
                at: 1,
                text: "hello".into(),
            })
            .unwrap();

        assert_eq!(patch.version, 1);
        assert_eq!(patch.new_selection, 6..6);
        assert_eq!(patch.changed, vec![1..6]);
        assert_eq!(doc.root().children()[0].plain_text(), "hello");
    }

    #[test]
    fn test_rejected_command_leaves_document_untouched() {
        let mut doc =
            Document::from_root(BlockTypeRegistry::standard(), fixtures::mixed_document()).unwrap();
        let before = doc.clone();

        // Dropping a table into a column would break the column rule
        let column_start = doc
            .outline()
            .into_iter()
            .find(|entry| entry.text == "left")
            .map(|entry| entry.address)
            .unwrap();
        let result = doc.apply(Cmd::InsertBlocks {
            at: column_start,
            nodes: vec![Node::atom(TABLE)],
        });

        assert!(matches!(result, Err(EditorError::InvariantViolation(_))));
        assert_eq!(doc, before);
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_deleting_last_block_of_container_is_rejected() {
        let root = Node::blocks(
            DOC,
            vec![Node::blocks(QUOTE, vec![Node::text(PARAGRAPH, "only")])],
        );
        let mut doc = Document::from_root(BlockTypeRegistry::standard(), root).unwrap();

        let result = doc.apply(Cmd::DeleteBlocks { range: 1..7 });
        assert!(matches!(result, Err(EditorError::InvariantViolation(_))));
    }

    #[test]
    fn test_check_never_commits() {
        let mut doc = Document::new(BlockTypeRegistry::standard());
        let typing = Cmd::InsertText {
            at: 1,
            text: "hi".into(),
        };

        // An accepted command is only reported as accepted
        doc.check(&typing).unwrap();
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.root().children()[0].plain_text(), "");

        // A rejected one reports the guard's verdict
        let emptying = Cmd::DeleteBlocks { range: 0..2 };
        assert!(matches!(
            doc.check(&emptying),
            Err(EditorError::InvariantViolation(_))
        ));

        doc.apply(typing).unwrap();
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn test_json_round_trip_keeps_id() {
        let registry = BlockTypeRegistry::standard();
        let doc = Document::from_root(registry.clone(), fixtures::mixed_document()).unwrap();

        let json = doc.to_json().unwrap();
        let loaded = Document::from_json(registry, &json).unwrap();

        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_from_json_rejects_invalid_tree() {
        let json = concat!(
            r#"{"id":"67e55044-10b1-426f-9247-bb680e5fe0c8","#,
            r#""root":{"kind":"quote","content":{"blocks":[]}}}"#
        );
        assert!(Document::from_json(BlockTypeRegistry::standard(), json).is_err());
    }

    #[test]
    fn test_outline_of_mixed_document() {
        let doc =
            Document::from_root(BlockTypeRegistry::standard(), fixtures::mixed_document()).unwrap();

        insta::assert_snapshot!(doc.format_outline(), @r#"
        heading@0 "Title"
        paragraph@7 "Intro"
        quote@14
          paragraph@15 "Quoted"
        toggle@24
            paragraph@35 "Hidden"
        columnLayout@45
            paragraph@47 "left"
            paragraph@55 "right"
        divider@64
        todoItem@65 "Task"
        "#);
    }
}
