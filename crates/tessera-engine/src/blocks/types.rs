use crate::editing::actions::{ActionTicket, LinkedPageService, PageRef};
use crate::models::{Attrs, Node};

/// How a block type participates in the tree structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralKind {
    /// A textblock with no block-level children.
    Leaf,
    /// Hosts nested blocks or further page containers.
    Container,
    /// A leaf with no editable text.
    Atom,
    /// Inline-only slot inside another block (e.g. a toggle title).
    Inline,
    /// Layout scaffolding: the root, column layouts and their slots.
    Structural,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub allow_in_column: bool,
    pub custom_drag_handle: bool,
    pub is_page_container: bool,
    pub suppress_toolbar: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MenuCategory {
    Basic,
    Lists,
    Containers,
    Layout,
    Media,
    Advanced,
}

impl MenuCategory {
    pub fn label(self) -> &'static str {
        match self {
            MenuCategory::Basic => "Basic",
            MenuCategory::Lists => "Lists",
            MenuCategory::Containers => "Containers",
            MenuCategory::Layout => "Layout",
            MenuCategory::Media => "Media",
            MenuCategory::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionEntry {
    pub order: u16,
    pub category: MenuCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionEntry {
    pub order: u16,
    pub shortcut: Option<&'static str>,
}

/// What a node of this type may contain. Checked by the structural guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    /// Inline text; `marks` says whether formatting is allowed.
    Inline { marks: bool },
    /// One or more blocks (page containers).
    Blocks,
    /// Exactly these slot kinds, in order.
    Slots(&'static [&'static str]),
    /// At least `min` slots of one kind.
    Repeat { kind: &'static str, min: usize },
    /// No content.
    Atom,
}

/// A custom insertion hook that needs an external service before the block
/// can be inserted (e.g. creating the page a link points at).
#[derive(Debug, Clone, Copy)]
pub struct InsertAction {
    pub name: &'static str,
    /// Asks the service to start the work tied to `ticket`.
    pub start: fn(&mut dyn LinkedPageService, ActionTicket),
    /// Builds the block once the work has produced a page.
    pub build: fn(&PageRef) -> Node,
}

/// One entry of the block catalog.
#[derive(Debug, Clone)]
pub struct BlockType {
    pub id: &'static str,
    /// Underlying node kind; several ids may share one kind.
    pub kind: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub structure: StructuralKind,
    pub capabilities: Capabilities,
    pub insertion: Option<InsertionEntry>,
    pub conversion: Option<ConversionEntry>,
    pub content: ContentRule,
    /// Attributes a freshly created node of this type carries.
    pub attrs: fn() -> Attrs,
    /// Attribute keys that tell apart ids sharing a kind (e.g. heading `level`).
    pub identity_attrs: &'static [&'static str],
    /// Overrides the content derived from `content` when instantiating.
    pub template: Option<fn() -> Node>,
    pub placeholder: Option<&'static str>,
    pub insert_action: Option<InsertAction>,
}

impl BlockType {
    /// Whether nodes of this type are addressable blocks, i.e. may sit
    /// directly inside a page container.
    pub fn is_block(&self) -> bool {
        match self.structure {
            StructuralKind::Leaf | StructuralKind::Container | StructuralKind::Atom => true,
            StructuralKind::Structural => !self.capabilities.is_page_container,
            StructuralKind::Inline => false,
        }
    }

    /// Textblock that can be converted and carries inline content.
    pub fn is_textblock(&self) -> bool {
        matches!(self.content, ContentRule::Inline { .. })
    }

    pub fn allows_marks(&self) -> bool {
        matches!(self.content, ContentRule::Inline { marks: true })
    }

    /// Counts as a container for locator tie-breaking.
    pub fn is_container_like(&self) -> bool {
        matches!(
            self.structure,
            StructuralKind::Container | StructuralKind::Structural
        )
    }

    /// A non-page-container wrapper whose slots are page containers.
    pub fn is_pass_through(&self) -> bool {
        self.structure == StructuralKind::Structural
            && !self.capabilities.is_page_container
            && matches!(self.content, ContentRule::Repeat { .. })
    }

    pub fn default_attrs(&self) -> Attrs {
        (self.attrs)()
    }
}
