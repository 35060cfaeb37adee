//! Built-in block types.
//!
//! Every entry is defined here once; menus, capability sets and the guard's
//! content rules are all derived from this list by the registry.

use serde_json::json;

use super::types::{
    BlockType, Capabilities, ContentRule, ConversionEntry, InsertAction, InsertionEntry,
    MenuCategory, StructuralKind,
};
use crate::editing::actions::{ActionTicket, LinkedPageService, PageRef};
use crate::models::{Attrs, Node};

pub const DOC: &str = "doc";
pub const PARAGRAPH: &str = "paragraph";
pub const HEADING: &str = "heading";
pub const BULLET_LIST_ITEM: &str = "bulletListItem";
pub const NUMBERED_LIST_ITEM: &str = "numberedListItem";
pub const TODO_ITEM: &str = "todoItem";
pub const CODE_BLOCK: &str = "codeBlock";
pub const QUOTE: &str = "quote";
pub const CALLOUT: &str = "callout";
pub const TOGGLE: &str = "toggle";
pub const TOGGLE_TITLE: &str = "toggleTitle";
pub const TOGGLE_CONTENT: &str = "toggleContent";
pub const COLUMN_LAYOUT: &str = "columnLayout";
pub const COLUMN: &str = "column";
pub const DIVIDER: &str = "divider";
pub const IMAGE: &str = "image";
pub const TABLE: &str = "table";
pub const LINKED_PAGE: &str = "linkedPage";

/// Id used when a lookup misses.
pub const DEFAULT_TYPE_ID: &str = PARAGRAPH;

fn no_attrs() -> Attrs {
    Attrs::new()
}

fn attrs_of(value: serde_json::Value) -> Attrs {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Attrs::new(),
    }
}

fn heading1_attrs() -> Attrs {
    attrs_of(json!({ "level": 1 }))
}

fn heading2_attrs() -> Attrs {
    attrs_of(json!({ "level": 2 }))
}

fn heading3_attrs() -> Attrs {
    attrs_of(json!({ "level": 3 }))
}

fn list_attrs() -> Attrs {
    attrs_of(json!({ "indent": 0 }))
}

fn todo_attrs() -> Attrs {
    attrs_of(json!({ "indent": 0, "checked": false }))
}

fn code_attrs() -> Attrs {
    attrs_of(json!({ "language": "" }))
}

fn callout_attrs() -> Attrs {
    attrs_of(json!({ "emoji": "💡" }))
}

fn image_attrs() -> Attrs {
    attrs_of(json!({ "src": "", "alt": "" }))
}

fn table_attrs() -> Attrs {
    attrs_of(json!({ "rows": [["", ""], ["", ""]] }))
}

fn linked_page_attrs() -> Attrs {
    attrs_of(json!({ "pageId": "", "title": "" }))
}

fn start_linked_page(pages: &mut dyn LinkedPageService, ticket: ActionTicket) {
    pages.create_page(ticket, "Untitled");
}

fn build_linked_page(page: &PageRef) -> Node {
    Node::atom(LINKED_PAGE)
        .with_attr("pageId", page.id.clone())
        .with_attr("title", page.title.clone())
}

const LINKED_PAGE_ACTION: InsertAction = InsertAction {
    name: "create-linked-page",
    start: start_linked_page,
    build: build_linked_page,
};

const TEXT_BLOCK: BlockType = BlockType {
    id: PARAGRAPH,
    kind: PARAGRAPH,
    label: "Text",
    icon: "text",
    structure: StructuralKind::Leaf,
    capabilities: Capabilities {
        allow_in_column: true,
        custom_drag_handle: false,
        is_page_container: false,
        suppress_toolbar: false,
    },
    insertion: None,
    conversion: None,
    content: ContentRule::Inline { marks: true },
    attrs: no_attrs,
    identity_attrs: &[],
    template: None,
    placeholder: None,
    insert_action: None,
};

const SLOT: BlockType = BlockType {
    id: COLUMN,
    kind: COLUMN,
    label: "",
    icon: "",
    structure: StructuralKind::Structural,
    capabilities: Capabilities {
        allow_in_column: false,
        custom_drag_handle: false,
        is_page_container: true,
        suppress_toolbar: true,
    },
    insertion: None,
    conversion: None,
    content: ContentRule::Blocks,
    attrs: no_attrs,
    identity_attrs: &[],
    template: None,
    placeholder: None,
    insert_action: None,
};

const CONTAINER: BlockType = BlockType {
    structure: StructuralKind::Container,
    capabilities: Capabilities {
        allow_in_column: true,
        custom_drag_handle: false,
        is_page_container: true,
        suppress_toolbar: false,
    },
    content: ContentRule::Blocks,
    ..TEXT_BLOCK
};

const ATOM: BlockType = BlockType {
    structure: StructuralKind::Atom,
    capabilities: Capabilities {
        allow_in_column: true,
        custom_drag_handle: false,
        is_page_container: false,
        suppress_toolbar: true,
    },
    content: ContentRule::Atom,
    ..TEXT_BLOCK
};

/// The built-in catalog, in definition order.
pub fn builtin() -> Vec<BlockType> {
    vec![
        BlockType {
            id: DOC,
            kind: DOC,
            label: "Page",
            icon: "page",
            capabilities: Capabilities {
                suppress_toolbar: false,
                ..SLOT.capabilities
            },
            ..SLOT
        },
        BlockType {
            insertion: Some(InsertionEntry {
                order: 0,
                category: MenuCategory::Basic,
            }),
            conversion: Some(ConversionEntry {
                order: 0,
                shortcut: Some("Ctrl+Alt+0"),
            }),
            placeholder: Some("Type '/' for commands"),
            ..TEXT_BLOCK
        },
        BlockType {
            id: "heading1",
            kind: HEADING,
            label: "Heading 1",
            icon: "h1",
            insertion: Some(InsertionEntry {
                order: 10,
                category: MenuCategory::Basic,
            }),
            conversion: Some(ConversionEntry {
                order: 10,
                shortcut: Some("Ctrl+Alt+1"),
            }),
            attrs: heading1_attrs,
            identity_attrs: &["level"],
            placeholder: Some("Heading 1"),
            ..TEXT_BLOCK
        },
        BlockType {
            id: "heading2",
            kind: HEADING,
            label: "Heading 2",
            icon: "h2",
            insertion: Some(InsertionEntry {
                order: 11,
                category: MenuCategory::Basic,
            }),
            conversion: Some(ConversionEntry {
                order: 11,
                shortcut: Some("Ctrl+Alt+2"),
            }),
            attrs: heading2_attrs,
            identity_attrs: &["level"],
            placeholder: Some("Heading 2"),
            ..TEXT_BLOCK
        },
        BlockType {
            id: "heading3",
            kind: HEADING,
            label: "Heading 3",
            icon: "h3",
            insertion: Some(InsertionEntry {
                order: 12,
                category: MenuCategory::Basic,
            }),
            conversion: Some(ConversionEntry {
                order: 12,
                shortcut: Some("Ctrl+Alt+3"),
            }),
            attrs: heading3_attrs,
            identity_attrs: &["level"],
            placeholder: Some("Heading 3"),
            ..TEXT_BLOCK
        },
        BlockType {
            id: BULLET_LIST_ITEM,
            kind: BULLET_LIST_ITEM,
            label: "Bulleted list",
            icon: "list-bullet",
            insertion: Some(InsertionEntry {
                order: 20,
                category: MenuCategory::Lists,
            }),
            conversion: Some(ConversionEntry {
                order: 20,
                shortcut: Some("-"),
            }),
            attrs: list_attrs,
            placeholder: Some("List"),
            ..TEXT_BLOCK
        },
        BlockType {
            id: NUMBERED_LIST_ITEM,
            kind: NUMBERED_LIST_ITEM,
            label: "Numbered list",
            icon: "list-numbered",
            insertion: Some(InsertionEntry {
                order: 21,
                category: MenuCategory::Lists,
            }),
            conversion: Some(ConversionEntry {
                order: 21,
                shortcut: Some("1."),
            }),
            attrs: list_attrs,
            placeholder: Some("List"),
            ..TEXT_BLOCK
        },
        BlockType {
            id: TODO_ITEM,
            kind: TODO_ITEM,
            label: "To-do list",
            icon: "checkbox",
            insertion: Some(InsertionEntry {
                order: 22,
                category: MenuCategory::Lists,
            }),
            conversion: Some(ConversionEntry {
                order: 22,
                shortcut: Some("[]"),
            }),
            attrs: todo_attrs,
            placeholder: Some("To-do"),
            ..TEXT_BLOCK
        },
        BlockType {
            id: CODE_BLOCK,
            kind: CODE_BLOCK,
            label: "Code",
            icon: "code",
            insertion: Some(InsertionEntry {
                order: 30,
                category: MenuCategory::Basic,
            }),
            conversion: Some(ConversionEntry {
                order: 30,
                shortcut: Some("```"),
            }),
            content: ContentRule::Inline { marks: false },
            attrs: code_attrs,
            capabilities: Capabilities {
                suppress_toolbar: true,
                ..TEXT_BLOCK.capabilities
            },
            ..TEXT_BLOCK
        },
        BlockType {
            id: QUOTE,
            kind: QUOTE,
            label: "Quote",
            icon: "quote",
            insertion: Some(InsertionEntry {
                order: 40,
                category: MenuCategory::Containers,
            }),
            conversion: Some(ConversionEntry {
                order: 40,
                shortcut: Some(">"),
            }),
            ..CONTAINER
        },
        BlockType {
            id: CALLOUT,
            kind: CALLOUT,
            label: "Callout",
            icon: "callout",
            insertion: Some(InsertionEntry {
                order: 41,
                category: MenuCategory::Containers,
            }),
            conversion: Some(ConversionEntry {
                order: 41,
                shortcut: None,
            }),
            attrs: callout_attrs,
            ..CONTAINER
        },
        BlockType {
            id: TOGGLE,
            kind: TOGGLE,
            label: "Toggle",
            icon: "toggle",
            insertion: Some(InsertionEntry {
                order: 42,
                category: MenuCategory::Containers,
            }),
            conversion: Some(ConversionEntry {
                order: 42,
                shortcut: Some("Ctrl+Alt+T"),
            }),
            content: ContentRule::Slots(&[TOGGLE_TITLE, TOGGLE_CONTENT]),
            capabilities: Capabilities {
                is_page_container: false,
                ..CONTAINER.capabilities
            },
            ..CONTAINER
        },
        BlockType {
            id: TOGGLE_TITLE,
            kind: TOGGLE_TITLE,
            label: "Toggle title",
            icon: "",
            structure: StructuralKind::Inline,
            capabilities: Capabilities::default(),
            placeholder: Some("Toggle"),
            ..TEXT_BLOCK
        },
        BlockType {
            id: TOGGLE_CONTENT,
            kind: TOGGLE_CONTENT,
            label: "Toggle content",
            ..SLOT
        },
        BlockType {
            id: COLUMN_LAYOUT,
            kind: COLUMN_LAYOUT,
            label: "Columns",
            icon: "columns",
            structure: StructuralKind::Structural,
            capabilities: Capabilities {
                allow_in_column: false,
                custom_drag_handle: true,
                is_page_container: false,
                suppress_toolbar: true,
            },
            insertion: Some(InsertionEntry {
                order: 50,
                category: MenuCategory::Layout,
            }),
            content: ContentRule::Repeat {
                kind: COLUMN,
                min: 2,
            },
            ..TEXT_BLOCK
        },
        BlockType {
            label: "Column",
            ..SLOT
        },
        BlockType {
            id: DIVIDER,
            kind: DIVIDER,
            label: "Divider",
            icon: "divider",
            insertion: Some(InsertionEntry {
                order: 13,
                category: MenuCategory::Basic,
            }),
            ..ATOM
        },
        BlockType {
            id: IMAGE,
            kind: IMAGE,
            label: "Image",
            icon: "image",
            insertion: Some(InsertionEntry {
                order: 60,
                category: MenuCategory::Media,
            }),
            attrs: image_attrs,
            capabilities: Capabilities {
                custom_drag_handle: true,
                ..ATOM.capabilities
            },
            ..ATOM
        },
        BlockType {
            id: TABLE,
            kind: TABLE,
            label: "Table",
            icon: "table",
            insertion: Some(InsertionEntry {
                order: 61,
                category: MenuCategory::Media,
            }),
            attrs: table_attrs,
            capabilities: Capabilities {
                allow_in_column: false,
                custom_drag_handle: true,
                ..ATOM.capabilities
            },
            ..ATOM
        },
        BlockType {
            id: LINKED_PAGE,
            kind: LINKED_PAGE,
            label: "Page link",
            icon: "page-link",
            insertion: Some(InsertionEntry {
                order: 70,
                category: MenuCategory::Advanced,
            }),
            attrs: linked_page_attrs,
            insert_action: Some(LINKED_PAGE_ACTION),
            ..ATOM
        },
    ]
}

/// Fallback used when a registry has no default type of its own.
pub fn fallback() -> BlockType {
    TEXT_BLOCK
}
