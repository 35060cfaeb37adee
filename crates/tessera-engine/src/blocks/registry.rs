use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::catalog;
use super::types::{BlockType, ContentRule, StructuralKind};
use crate::models::{Node, NodeContent};

/// An insertion-ordered set of node kinds with each kind present once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindSet(Vec<&'static str>);

impl KindSet {
    fn insert(&mut self, kind: &'static str) {
        if !self.0.contains(&kind) {
            self.0.push(kind);
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.0.iter().any(|k| *k == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The catalog of block types and every index derived from it.
///
/// Built once and never mutated. The derived kind sets are the only copy in the
/// process: the locator, the transformer, the guard and the menus all read them
/// from here.
#[derive(Debug)]
pub struct BlockTypeRegistry {
    types: Vec<BlockType>,
    by_id: HashMap<&'static str, usize>,
    insertion_menu: Vec<usize>,
    conversion_menu: Vec<usize>,
    page_container_kinds: KindSet,
    column_eligible_kinds: KindSet,
    custom_drag_kinds: KindSet,
    toolbar_suppressed_kinds: KindSet,
    leaf_kinds: KindSet,
    container_kinds: KindSet,
    atom_kinds: KindSet,
    fallback: BlockType,
}

impl BlockTypeRegistry {
    /// Builds a registry. Later entries reusing an id are ignored.
    pub fn new(types: Vec<BlockType>) -> Self {
        let mut kept: Vec<BlockType> = Vec::with_capacity(types.len());
        let mut by_id = HashMap::new();
        for block_type in types {
            if by_id.contains_key(block_type.id) {
                log::warn!("ignoring duplicate block type id {:?}", block_type.id);
                continue;
            }
            by_id.insert(block_type.id, kept.len());
            kept.push(block_type);
        }

        let mut insertion_menu: Vec<usize> = (0..kept.len())
            .filter(|&i| kept[i].insertion.is_some())
            .collect();
        insertion_menu.sort_by_key(|&i| kept[i].insertion.map(|entry| entry.order));

        let mut conversion_menu: Vec<usize> = (0..kept.len())
            .filter(|&i| kept[i].conversion.is_some())
            .collect();
        conversion_menu.sort_by_key(|&i| kept[i].conversion.map(|entry| entry.order));

        let mut page_container_kinds = KindSet::default();
        let mut column_eligible_kinds = KindSet::default();
        let mut custom_drag_kinds = KindSet::default();
        let mut toolbar_suppressed_kinds = KindSet::default();
        let mut leaf_kinds = KindSet::default();
        let mut container_kinds = KindSet::default();
        let mut atom_kinds = KindSet::default();

        for block_type in &kept {
            let caps = block_type.capabilities;
            if caps.is_page_container {
                page_container_kinds.insert(block_type.kind);
            }
            if caps.allow_in_column {
                column_eligible_kinds.insert(block_type.kind);
            }
            if caps.custom_drag_handle {
                custom_drag_kinds.insert(block_type.kind);
            }
            if caps.suppress_toolbar {
                toolbar_suppressed_kinds.insert(block_type.kind);
            }
            match block_type.structure {
                StructuralKind::Leaf => leaf_kinds.insert(block_type.kind),
                StructuralKind::Container => container_kinds.insert(block_type.kind),
                StructuralKind::Atom => atom_kinds.insert(block_type.kind),
                StructuralKind::Inline | StructuralKind::Structural => {}
            }
        }

        let fallback = by_id
            .get(catalog::DEFAULT_TYPE_ID)
            .map(|&i| kept[i].clone())
            .unwrap_or_else(catalog::fallback);

        Self {
            types: kept,
            by_id,
            insertion_menu,
            conversion_menu,
            page_container_kinds,
            column_eligible_kinds,
            custom_drag_kinds,
            toolbar_suppressed_kinds,
            leaf_kinds,
            container_kinds,
            atom_kinds,
            fallback,
        }
    }

    /// The shared registry holding the built-in catalog.
    pub fn standard() -> Arc<Self> {
        static STANDARD: OnceLock<Arc<BlockTypeRegistry>> = OnceLock::new();
        STANDARD
            .get_or_init(|| Arc::new(Self::new(catalog::builtin())))
            .clone()
    }

    pub fn lookup(&self, id: &str) -> Option<&BlockType> {
        self.by_id.get(id).map(|&i| &self.types[i])
    }

    /// Like [`lookup`](Self::lookup) but falls back to the default text block.
    pub fn lookup_or_default(&self, id: &str) -> &BlockType {
        self.lookup(id).unwrap_or_else(|| {
            log::debug!("unknown block type {id:?}, using {}", self.fallback.id);
            &self.fallback
        })
    }

    /// First type registered with `kind`.
    pub fn by_kind(&self, kind: &str) -> Option<&BlockType> {
        self.types.iter().find(|block_type| block_type.kind == kind)
    }

    /// The type describing `node`, using identity attributes to tell apart
    /// ids that share a kind (e.g. heading levels).
    pub fn match_node(&self, node: &Node) -> Option<&BlockType> {
        self.types
            .iter()
            .filter(|block_type| block_type.kind == node.kind)
            .find(|block_type| {
                let defaults = block_type.default_attrs();
                block_type
                    .identity_attrs
                    .iter()
                    .all(|key| node.attrs.get(*key) == defaults.get(*key))
            })
            .or_else(|| self.by_kind(&node.kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockType> {
        self.types.iter()
    }

    /// Insertion-menu entries in ascending menu order.
    pub fn list_for_insertion_menu(&self) -> Vec<&BlockType> {
        self.insertion_menu.iter().map(|&i| &self.types[i]).collect()
    }

    /// Conversion-menu entries in ascending menu order.
    pub fn list_for_conversion_menu(&self) -> Vec<&BlockType> {
        self.conversion_menu.iter().map(|&i| &self.types[i]).collect()
    }

    pub fn page_container_kinds(&self) -> &KindSet {
        &self.page_container_kinds
    }

    pub fn column_eligible_kinds(&self) -> &KindSet {
        &self.column_eligible_kinds
    }

    pub fn custom_drag_kinds(&self) -> &KindSet {
        &self.custom_drag_kinds
    }

    pub fn toolbar_suppressed_kinds(&self) -> &KindSet {
        &self.toolbar_suppressed_kinds
    }

    pub fn leaf_kinds(&self) -> &KindSet {
        &self.leaf_kinds
    }

    pub fn container_kinds(&self) -> &KindSet {
        &self.container_kinds
    }

    pub fn atom_kinds(&self) -> &KindSet {
        &self.atom_kinds
    }

    pub fn is_page_container(&self, kind: &str) -> bool {
        self.page_container_kinds.contains(kind)
    }

    /// A fresh node for `block_type`: its template if it has one, otherwise
    /// content synthesized from its content rule.
    pub fn instantiate(&self, block_type: &BlockType) -> Node {
        if let Some(template) = block_type.template {
            return template();
        }
        let content = match block_type.content {
            ContentRule::Inline { .. } => NodeContent::Inline(Vec::new()),
            ContentRule::Atom => NodeContent::Atom,
            ContentRule::Blocks => NodeContent::Blocks(vec![self.instantiate(&self.fallback)]),
            ContentRule::Slots(kinds) => NodeContent::Blocks(
                kinds
                    .iter()
                    .filter_map(|kind| self.by_kind(kind))
                    .map(|slot| self.instantiate(slot))
                    .collect(),
            ),
            ContentRule::Repeat { kind, min } => NodeContent::Blocks(
                self.by_kind(kind)
                    .map(|slot| (0..min).map(|_| self.instantiate(slot)).collect())
                    .unwrap_or_default(),
            ),
        };
        Node {
            kind: block_type.kind.to_string(),
            attrs: block_type.default_attrs(),
            content,
        }
    }

    /// An empty default text block.
    pub fn empty_text_block(&self) -> Node {
        self.instantiate(&self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::catalog::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_returns_entry_with_same_id() {
        let registry = BlockTypeRegistry::standard();
        for block_type in registry.iter() {
            let found = registry.lookup(block_type.id).expect("registered id");
            assert_eq!(found.id, block_type.id);
        }
    }

    #[test]
    fn test_lookup_miss_is_empty_and_default_falls_back() {
        let registry = BlockTypeRegistry::standard();
        assert!(registry.lookup("nope").is_none());
        assert_eq!(registry.lookup_or_default("nope").id, PARAGRAPH);
    }

    #[test]
    fn test_by_kind_returns_first_heading() {
        let registry = BlockTypeRegistry::standard();
        assert_eq!(registry.by_kind(HEADING).map(|t| t.id), Some("heading1"));
    }

    #[test]
    fn test_match_node_uses_identity_attrs() {
        let registry = BlockTypeRegistry::standard();
        let node = Node::text(HEADING, "x").with_attr("level", 3);
        assert_eq!(registry.match_node(&node).map(|t| t.id), Some("heading3"));
        let odd = Node::text(HEADING, "x").with_attr("level", 9);
        assert_eq!(registry.match_node(&odd).map(|t| t.id), Some("heading1"));
    }

    #[test]
    fn test_column_eligible_kinds_collapse_shared_kinds() {
        let registry = BlockTypeRegistry::standard();
        let kinds: Vec<_> = registry.column_eligible_kinds().iter().collect();
        let headings = kinds.iter().filter(|k| **k == HEADING).count();
        assert_eq!(headings, 1);

        let mut deduped = kinds.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), kinds.len());
        assert!(!registry.column_eligible_kinds().contains(COLUMN_LAYOUT));
        assert!(!registry.column_eligible_kinds().contains(TABLE));
    }

    #[test]
    fn test_page_container_kinds() {
        let registry = BlockTypeRegistry::standard();
        let kinds: Vec<_> = registry.page_container_kinds().iter().collect();
        assert_eq!(kinds, vec![DOC, QUOTE, CALLOUT, TOGGLE_CONTENT, COLUMN]);
    }

    #[test]
    fn test_custom_drag_kinds() {
        let registry = BlockTypeRegistry::standard();
        let kinds: Vec<_> = registry.custom_drag_kinds().iter().collect();
        assert_eq!(kinds, vec![COLUMN_LAYOUT, IMAGE, TABLE]);
    }

    #[test]
    fn test_menus_are_sorted_by_order() {
        let registry = BlockTypeRegistry::standard();

        let insertion: Vec<u16> = registry
            .list_for_insertion_menu()
            .iter()
            .filter_map(|t| t.insertion.map(|e| e.order))
            .collect();
        let mut sorted = insertion.clone();
        sorted.sort();
        assert_eq!(insertion, sorted);

        let conversion: Vec<&str> = registry
            .list_for_conversion_menu()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(conversion.first(), Some(&PARAGRAPH));
        assert!(conversion.contains(&TOGGLE));
        assert!(!conversion.contains(&IMAGE));
    }

    #[test]
    fn test_duplicate_ids_keep_first_entry() {
        let mut types = builtin();
        let mut shadow = types[1].clone();
        shadow.label = "Shadow";
        types.push(shadow);

        let registry = BlockTypeRegistry::new(types);
        assert_eq!(registry.lookup(PARAGRAPH).map(|t| t.label), Some("Text"));
    }

    #[test]
    fn test_instantiate_synthesizes_slots() {
        let registry = BlockTypeRegistry::standard();

        let toggle = registry.instantiate(registry.lookup(TOGGLE).unwrap());
        let kinds: Vec<_> = toggle.children().iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, vec![TOGGLE_TITLE, TOGGLE_CONTENT]);
        assert_eq!(toggle.children()[1].children().len(), 1);

        let columns = registry.instantiate(registry.lookup(COLUMN_LAYOUT).unwrap());
        assert_eq!(columns.children().len(), 2);

        let heading = registry.instantiate(registry.lookup("heading2").unwrap());
        assert_eq!(heading.attrs.get("level"), Some(&serde_json::json!(2)));
    }
}
